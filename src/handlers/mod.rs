pub mod device;
pub mod global_404;
pub mod payment;
pub mod ping;

pub use device::device_heartbeat_handler;
pub use device::get_devices_handler;
pub use device::register_device_handler;
pub use device::unregister_device_handler;

pub use global_404::global_404_handler;

pub use payment::active_otps_handler;
pub use payment::cancel_payment_handler;
pub use payment::confirm_payment_handler;
pub use payment::initiate_payment_handler;

pub use ping::ping_handler;
