pub mod create;
pub mod mount;
pub mod umount;

pub use create::create;
pub use mount::mount;
pub use umount::umount;
