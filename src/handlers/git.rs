use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

const REPOS_DIR: &str = "repos";
const UPDATE_FILE: &str = "update.txt";
const UPDATE_TEXT: &str = "This is an automated update.\n";
const COMMIT_MESSAGE: &str = "Automated update";

static REPO_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+?\.git\b").expect("static regex"));

/// Clones a repository under `repos/`, writes a marker file and commits it.
/// Pushing is opt-in through configuration.
#[derive(Debug, Default)]
pub struct GitUpdate;

#[async_trait]
impl Handler for GitUpdate {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let raw = REPO_URL.find(task.normalized()).ok_or_else(|| {
            TaskError::BadRequest("No Git repository URL provided".to_string())
        })?;
        let url = Url::parse(raw.as_str())
            .map_err(|e| TaskError::BadRequest(format!("invalid repository URL: {e}")))?;
        let name = repo_name(&url)
            .ok_or_else(|| TaskError::BadRequest(format!("cannot derive a repository name from {url}")))?;

        let repo = ctx.resolve(&format!("{REPOS_DIR}/{name}"))?;
        let root = ctx.sandbox().root().to_path_buf();
        let git = ctx.tools().git.clone();

        let is_checkout = tokio::fs::try_exists(repo.join(".git"))
            .await
            .with_context(|| format!("inspecting {REPOS_DIR}/{name}"))?;
        if !is_checkout {
            // A directory without `.git` is what an interrupted clone leaves behind.
            remove_leftover(&repo)
                .await
                .with_context(|| format!("clearing {REPOS_DIR}/{name}"))?;
            let parent = ctx.resolve(REPOS_DIR)?;
            tokio::fs::create_dir_all(&parent)
                .await
                .context("creating repos directory")?;
            let clone = ctx
                .command(&git)
                .arg("clone")
                .arg(url.as_str())
                .arg(repo.to_string_lossy())
                .cwd(&root);
            if let Err(err) = ctx.run_tool(&clone).await {
                if let Err(e) = remove_leftover(&repo).await {
                    warn!(repo = %name, error = %e, "partial clone left in place");
                }
                return Err(err);
            }
        }

        let artifact = ctx
            .write_artifact(&format!("{REPOS_DIR}/{name}/{UPDATE_FILE}"), UPDATE_TEXT.as_bytes())
            .await?;

        let add = ctx.command(&git).arg("add").arg(UPDATE_FILE).cwd(&repo);
        ctx.run_tool(&add).await?;
        let commit = ctx
            .command(&git)
            .args(["-c", "user.name=taskrune", "-c", "user.email=taskrune@localhost"])
            .args(["commit", "--allow-empty", "-m", COMMIT_MESSAGE])
            .cwd(&repo);
        ctx.run_tool(&commit).await?;

        let pushed = ctx.git_push();
        if pushed {
            let push = ctx.command(&git).arg("push").cwd(&repo);
            ctx.run_tool(&push).await?;
        }
        info!(repo = %name, pushed, "repository updated");

        let message = if pushed {
            format!("Repository {name} updated and changes pushed.")
        } else {
            format!("Repository {name} updated.")
        };
        Ok(Completed::new(message).with_artifact(artifact))
    }
}

async fn remove_leftover(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn repo_name(url: &Url) -> Option<String> {
    let last = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let name = last.strip_suffix(".git")?;
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then(|| name.to_string())
}
