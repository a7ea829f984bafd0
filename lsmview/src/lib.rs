pub mod command;
pub mod shadow;
pub mod timer;
pub mod ui;
pub mod ws;

pub use shadow::ShadowModel;
pub use ui::{Presenter, UiPort};
pub use ws::ConnectionManager;
