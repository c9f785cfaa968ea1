pub mod app;
pub mod helper;

pub use app::build_test_app;
pub use app::StubPush;
pub use app::TestApp;

pub use helper::build_get_request;
pub use helper::build_post_request;
pub use helper::read_json;
