mod bus;
pub use bus::{Subscription, ThreadBus, ThreadEvent};

mod comment;
pub use comment::{CommentStatus, NormalizedComment, TempId};

mod config;
pub use config::{Config, LayoutMode};

mod controller;
pub use controller::{
    Applied, FetchRequest, FetchResponse, Projection, RequestToken, ThreadController, ViewState,
};

mod debounce;
pub use debounce::Debouncer;

mod error;
pub use error::Error;

mod flatten;
pub use flatten::{flatten, flatten_replies, flatten_thread, FlatComment};

mod layout;
pub use layout::{LayoutStats, Measure, RowLayout, ThreadLayout, ELBOW};

mod mutate;
pub use mutate::{insert_reply, remove_node, replace_node, update_node, CommentPatch};

mod normalize;
pub use normalize::{normalize, normalize_with_report, Anomalies};

mod pending;
pub use pending::{PendingChange, PendingLedger};

pub mod api {
    pub use chatter_api::*;
}
