use crate::backend::MountOptions;
use crate::dispatcher::BackendDispatcher;
use crate::error::Result;
use crate::repo::Repository;
use std::path::Path;

/// Mount the repository at `mount_point`
pub fn mount(
    dispatcher: &BackendDispatcher,
    repo_dir: &Path,
    mount_point: &str,
    options: Option<&str>,
) -> Result<()> {
    let repo = Repository::new(repo_dir)?;
    let options = MountOptions::parse(options);

    println!("Mounting {}...", dispatcher.backend_name());
    let target = dispatcher.mount(&repo, mount_point, &options)?;

    println!(
        "Mounted '{}' at '{}'",
        repo.objects_dir().display(),
        target
    );
    Ok(())
}
