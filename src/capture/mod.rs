pub mod device;
pub mod format;
pub mod frame;
pub mod pacer;
pub mod pool;
pub mod session;

pub use device::VideoDevice;
pub use frame::FrameHandle;
pub use pool::CaptureBufferPool;
pub use session::CaptureSession;
