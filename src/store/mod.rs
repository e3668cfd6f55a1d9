//! Questionnaire tree state and the action-driven mutation protocol.

pub mod actions;
pub mod dispatcher;
pub mod reducer;
pub mod state;

pub use actions::{Action, ItemField, MetadataField};
pub use dispatcher::TreeStore;
pub use reducer::{apply, mint_link_id};
pub use state::TreeState;
