//! Domain Services for GradTrack.
//!
//! One async trait per entity family, each with two interchangeable
//! implementations: the HTTP API and an in-memory mock. [`Backend`] bundles
//! one of each family and is chosen once from [`ClientConfig`].

pub mod backend;
pub mod config;
pub mod http;
pub mod mock;
pub mod session;
pub mod traits;
pub mod transport;

pub use backend::Backend;
pub use config::{BackendKind, ClientConfig, ConfigError, DEFAULT_API_URL};
pub use mock::{MockBackend, MockDatabase};
pub use session::SessionContext;
pub use traits::{
    progress_channel, AuthService, CommentService, FileService, FolderService,
    NotificationService, ProgressReceiver, ProgressSender, ProjectService,
};
pub use transport::HttpTransport;
