use crate::dispatcher::BackendDispatcher;
use crate::error::{CryptfsError, Result};
use crate::repo::Repository;
use std::path::Path;

/// Create a new encrypted repository owned by the GPG `user`
pub fn create(dispatcher: &BackendDispatcher, user: &str, repo_dir: &Path) -> Result<()> {
    let repo = Repository::new(repo_dir)?;
    println!(
        "Creating repository at '{}' with {}...",
        repo.root().display(),
        dispatcher.backend_name()
    );

    if let Err(err) = dispatcher.create(user, &repo) {
        let touched_disk = !matches!(
            err,
            CryptfsError::Precondition(_) | CryptfsError::InvalidInput(_)
        );
        if touched_disk && repo.root().exists() {
            eprintln!(
                "Note: '{}' may be partially initialized; remove it before retrying.",
                repo.root().display()
            );
        }
        return Err(err);
    }

    println!("Repository created successfully at '{}'", repo.root().display());
    Ok(())
}
