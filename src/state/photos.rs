// Photo, search, and session state.
// Data shown outside the paginated feeds.

use std::path::Path;

use crate::api::{
    Metadata, MetadataCreationRequest, MetadataUpdateRequest, MetadataWithName, UploadRequest,
    User,
};

use super::form::Form;
use super::list::{LoadingState, SelectableList};

/// The photo opened in the detail pane.
#[derive(Debug, Clone)]
pub struct DetailState {
    pub name: String,
    pub metadata: LoadingState<Metadata>,
}

impl DetailState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: LoadingState::Loading,
        }
    }

    /// Edit form prefilled from the loaded metadata.
    pub fn edit_form(&self) -> Form {
        let (tags, description) = match self.metadata.data() {
            Some(m) => (
                m.tags.iter().cloned().collect::<Vec<_>>().join(", "),
                m.description.clone(),
            ),
            None => (String::new(), String::new()),
        };
        Form::new("Edit Photo")
            .field("Tags", tags)
            .field("Description", description)
    }
}

/// Build an update from a submitted edit form.
pub fn update_request(form: &Form) -> MetadataUpdateRequest {
    MetadataUpdateRequest::from_tag_list(form.value("Tags"), form.value("Description"))
}

pub fn upload_form() -> Form {
    Form::new("Upload Photo")
        .field("Path", "")
        .field("Tags", "")
        .field("Description", "")
}

/// Build an upload from a submitted form and the file it points at.
///
/// The photo is stored under the file name.
pub fn upload_request(form: &Form, data: Vec<u8>) -> Option<UploadRequest> {
    let path = Path::new(form.value("Path"));
    let name = path.file_name()?.to_str()?.to_string();
    Some(UploadRequest {
        content_type: content_type_for(path).to_string(),
        name,
        data,
        metadata: MetadataCreationRequest {
            tags: form.value("Tags").to_string(),
            description: form.value("Description").to_string(),
        },
    })
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Search tab state.
#[derive(Debug, Default)]
pub struct SearchState {
    pub input: String,
    pub editing: bool,
    pub results: LoadingState<Vec<MetadataWithName>>,
    pub list: SelectableList,
}

impl SearchState {
    pub fn selected(&self) -> Option<&MetadataWithName> {
        let index = self.list.selected()?;
        self.results.data()?.get(index)
    }

    pub fn len(&self) -> usize {
        self.results.data().map_or(0, Vec::len)
    }

    pub fn set_results(&mut self, results: LoadingState<Vec<MetadataWithName>>) {
        self.results = results;
        self.list.reset();
        let len = self.len();
        self.list.clamp(len);
    }
}

/// Who is signed in.
#[derive(Debug, Default)]
pub struct SessionState {
    pub user: LoadingState<User>,
}

impl SessionState {
    pub fn label(&self) -> String {
        match &self.user {
            LoadingState::Loaded(user) => user.primary_email.clone(),
            LoadingState::Loading => "signing in".to_string(),
            LoadingState::Error(_) => "session error".to_string(),
            LoadingState::Idle | LoadingState::Absent => "signed out".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    #[test]
    fn test_edit_form_prefills_metadata() {
        let mut detail = DetailState::new("x.png");
        detail.metadata = LoadingState::Loaded(Metadata {
            creator_email: "a@example.com".into(),
            created_at: Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
            tags: BTreeSet::from(["sea".to_string(), "cat".to_string()]),
            description: "beach".into(),
        });

        let form = detail.edit_form();
        assert_eq!(form.value("Tags"), "cat, sea");
        assert_eq!(form.value("Description"), "beach");

        let request = update_request(&form);
        assert_eq!(request.tags, vec!["cat", "sea"]);
    }

    #[test]
    fn test_upload_request_uses_file_name() {
        let mut form = upload_form();
        form.fields[0].value = "/tmp/photos/Cat.JPG".into();
        form.fields[1].value = "cat".into();

        let request = upload_request(&form, vec![0xff]).unwrap();
        assert_eq!(request.name, "Cat.JPG");
        assert_eq!(request.content_type, "image/jpeg");
        assert_eq!(request.metadata.tags, "cat");
        assert_eq!(request.metadata.description, "");
    }

    #[test]
    fn test_upload_request_needs_a_file_name() {
        assert!(upload_request(&upload_form(), Vec::new()).is_none());
    }

    #[test]
    fn test_session_label() {
        let mut session = SessionState::default();
        assert_eq!(session.label(), "signed out");

        session.user = LoadingState::Loaded(User {
            primary_email: "me@example.com".into(),
            emails: Vec::new(),
        });
        assert_eq!(session.label(), "me@example.com");
    }
}
