pub mod rules;
pub mod state;

pub use state::GameState;
