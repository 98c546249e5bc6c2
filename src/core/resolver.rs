use crate::core::service::{repository_name, CodeCommitService};
use crate::domain::model::{MicroagentContent, MicroagentResponse};
use crate::domain::ports::CodeCommitApi;
use crate::utils::error::{GitServiceError, Result, FILE_DOES_NOT_EXIST, FOLDER_DOES_NOT_EXIST};
use serde::Deserialize;

pub const MICROAGENTS_DIR: &str = ".openhands/microagents";
pub const CURSORRULES_FILE: &str = ".cursorrules";

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    triggers: Vec<String>,
}

/// Trigger words from a leading `---` YAML block. Files without one, or
/// with one that does not parse, have no triggers.
pub fn parse_triggers(content: &str) -> Vec<String> {
    let Some(rest) = content.strip_prefix("---") else {
        return Vec::new();
    };
    let Some(end) = rest.find("\n---") else {
        return Vec::new();
    };

    match serde_yaml::from_str::<FrontMatter>(&rest[..end]) {
        Ok(front_matter) => front_matter.triggers,
        Err(e) => {
            tracing::debug!("Ignoring unparsable front matter: {}", e);
            Vec::new()
        }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl<A: CodeCommitApi> CodeCommitService<A> {
    pub async fn get_microagent_content(
        &self,
        repository: &str,
        path: &str,
    ) -> Result<MicroagentContent> {
        let name = repository_name(repository);
        let bytes = match self.api().get_file(name, path).await {
            Ok(bytes) => bytes,
            Err(e) if e.has_code(FILE_DOES_NOT_EXIST) => {
                return Err(GitServiceError::ResourceNotFound(format!(
                    "File {} not found in repository {}",
                    path, name
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let content = String::from_utf8_lossy(&bytes).into_owned();
        Ok(MicroagentContent {
            triggers: parse_triggers(&content),
            content,
            path: path.to_string(),
        })
    }

    /// Contents of `.cursorrules`, or `None` when the repository has none.
    pub async fn get_cursorrules(&self, repository: &str) -> Result<Option<String>> {
        match self
            .api()
            .get_file(repository_name(repository), CURSORRULES_FILE)
            .await
        {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.has_code(FILE_DOES_NOT_EXIST) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Markdown files directly inside `directory` on the default branch.
    pub async fn list_microagents_in_directory(
        &self,
        repository: &str,
        directory: &str,
    ) -> Result<Vec<MicroagentResponse>> {
        let name = repository_name(repository);
        let default_branch = self.get_default_branch(name).await?;
        let commit = self.api().get_branch(name, &default_branch).await?;

        let files = match self
            .api()
            .get_folder(name, directory, commit.as_deref())
            .await
        {
            Ok(files) => files,
            Err(e) if e.has_code(FOLDER_DOES_NOT_EXIST) => {
                tracing::info!(
                    "Microagents directory {} not found in repository {}",
                    directory,
                    name
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let directory = directory.trim_end_matches('/');
        Ok(files
            .iter()
            .map(|path| file_name(path))
            .filter(|file| file.ends_with(".md"))
            .map(|file| MicroagentResponse {
                name: file.to_string(),
                path: format!("{}/{}", directory, file),
            })
            .collect())
    }

    /// `.cursorrules` (when present) followed by the microagent directory.
    pub async fn get_microagents(&self, repository: &str) -> Result<Vec<MicroagentResponse>> {
        let mut microagents = Vec::new();
        if self.get_cursorrules(repository).await?.is_some() {
            microagents.push(MicroagentResponse {
                name: CURSORRULES_FILE.to_string(),
                path: CURSORRULES_FILE.to_string(),
            });
        }
        microagents.extend(
            self.list_microagents_in_directory(repository, MICROAGENTS_DIR)
                .await?,
        );
        Ok(microagents)
    }
}
