pub mod error;
pub use error::CoreError;

pub mod dispatch;
pub use dispatch::{CommandTemplate, Dispatcher, JobSource, Separator};

pub mod eta;
pub use eta::Eta;

pub mod term;
pub use term::{Console, Renderer, select_console};

pub mod status;
pub use status::{DisplayOptions, StatusAggregator, Summary};

mod run;
pub use run::{RunConfig, run};
