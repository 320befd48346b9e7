pub mod content;
pub mod crafting;
pub mod directives;
pub mod districts;
pub mod engine;
pub mod ledger;
pub mod persist;
pub mod runtime;
pub mod save;
pub mod server;
pub mod state;
pub mod store;
pub mod story;
pub mod tenants;
pub mod tutorial;

pub use content::Content;
pub use engine::{Action, Engine};
pub use state::GameState;
