use crate::dispatcher::BackendDispatcher;
use crate::error::Result;

/// Unmount whatever is mounted at `mount_point`
pub fn umount(dispatcher: &BackendDispatcher, mount_point: &str) -> Result<()> {
    println!("Unmounting '{}'...", mount_point);

    let target = dispatcher.umount(mount_point)?;

    println!("Unmounted '{}' successfully.", target);
    Ok(())
}
