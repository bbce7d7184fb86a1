// Photo API endpoint functions.
// Typed reads and writes over the REST paths the backend serves.

use crate::error::ClassifiedError;

use super::client::ApiClient;
use super::transport::ApiRequest;
use super::types::{
    Metadata, MetadataUpdateRequest, MetadataWithName, SearchRequest, TagsWithSample,
    UploadRequest, User,
};

pub const USER_PATH: &str = "/api/user";
pub const TAGS_WITH_SAMPLE_PATH: &str = "/api/tags-with-sample";
pub const METADATAS_PATH: &str = "/api/metadatas";
pub const METADATAS_BY_TAG_PATH: &str = "/api/metadatas-by-tag";
pub const SEARCH_PATH: &str = "/api/search";
pub const LOGOUT_PATH: &str = "/auth/logout";

pub fn metadata_path(name: &str) -> String {
    format!("/asset/metadata/{}", name)
}

pub fn photo_path(name: &str) -> String {
    format!("/api/photo/{}", name)
}

type ReadResult<T> = Result<Option<T>, ClassifiedError>;

impl ApiClient {
    /// Get the signed-in user; `None` when not signed in.
    pub async fn current_user(&self) -> ReadResult<User> {
        self.fetch(ApiRequest::get(USER_PATH)).await
    }

    /// Get one page of tags, each with a sample photo.
    pub async fn tags_with_sample(&self, page: u32) -> ReadResult<TagsWithSample> {
        self.fetch(ApiRequest::get(TAGS_WITH_SAMPLE_PATH).param("page", page))
            .await
    }

    /// Get one page of metadata across all photos.
    pub async fn metadatas(&self, page: u32) -> ReadResult<Vec<MetadataWithName>> {
        self.fetch(ApiRequest::get(METADATAS_PATH).param("page", page))
            .await
    }

    /// Get one page of metadata for photos carrying `tag`.
    pub async fn metadatas_by_tag(
        &self,
        tag: &str,
        page: u32,
    ) -> ReadResult<Vec<MetadataWithName>> {
        if tag.is_empty() {
            return Ok(Some(Vec::new()));
        }
        self.fetch(
            ApiRequest::get(METADATAS_BY_TAG_PATH)
                .param("tag", tag)
                .param("page", page),
        )
        .await
    }

    /// Get the metadata of a single photo.
    pub async fn metadata(&self, name: &str) -> ReadResult<Metadata> {
        if name.is_empty() {
            return Ok(None);
        }
        self.fetch(ApiRequest::get(metadata_path(name))).await
    }

    pub async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<MetadataWithName>, ClassifiedError> {
        self.execute_json(ApiRequest::post(SEARCH_PATH).json(request)?)
            .await
    }

    /// Upload a photo; returns the name it was stored under.
    pub async fn upload_photo(&self, request: &UploadRequest) -> Result<String, ClassifiedError> {
        let metadata = &request.metadata;
        let api_request = ApiRequest::post(photo_path(&request.name))
            .param("tags", &metadata.tags)
            .param("description", &metadata.description)
            .binary(request.content_type.clone(), request.data.clone());

        self.execute(api_request).await?;
        Ok(request.name.clone())
    }

    pub async fn update_photo(
        &self,
        name: &str,
        request: &MetadataUpdateRequest,
    ) -> Result<(), ClassifiedError> {
        self.execute(ApiRequest::put(photo_path(name)).json(request)?)
            .await?;
        Ok(())
    }

    pub async fn delete_photo(&self, name: &str) -> Result<(), ClassifiedError> {
        self.execute(ApiRequest::delete(photo_path(name))).await?;
        Ok(())
    }

    /// End the server-side session.
    pub async fn logout(&self) -> Result<(), ClassifiedError> {
        self.execute(ApiRequest::get(LOGOUT_PATH)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::scripted_client;
    use crate::api::transport::RequestBody;
    use crate::api::types::MetadataCreationRequest;
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    fn metadata_json(name: &str) -> serde_json::Value {
        json!({
            "creatorEmail": "a@example.com",
            "createdAt": "2023-01-02T03:04:05Z",
            "tags": ["cat"],
            "description": "",
            "name": name
        })
    }

    #[tokio::test]
    async fn test_paged_reads_send_page_param() {
        let (client, transport, _) = scripted_client("/");
        transport.respond(
            "GET /api/metadatas?page=3",
            StatusCode::OK,
            json!([metadata_json("a.png")]),
        );
        transport.respond(
            "GET /api/metadatas-by-tag?tag=cat&page=0",
            StatusCode::OK,
            json!([]),
        );
        transport.respond(
            "GET /api/tags-with-sample?page=1",
            StatusCode::OK,
            json!({ "cat": metadata_json("a.png") }),
        );

        let page = client.metadatas(3).await.unwrap().unwrap();
        assert_eq!(page[0].name, "a.png");

        let by_tag = client.metadatas_by_tag("cat", 0).await.unwrap().unwrap();
        assert!(by_tag.is_empty());

        let tags = client.tags_with_sample(1).await.unwrap().unwrap();
        assert!(tags.contains_key("cat"));
    }

    #[tokio::test]
    async fn test_empty_tag_and_name_skip_request() {
        let (client, transport, _) = scripted_client("/");

        assert_eq!(client.metadatas_by_tag("", 0).await.unwrap(), Some(Vec::new()));
        assert_eq!(client.metadata("").await.unwrap(), None);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upload_sends_binary_and_metadata_params() {
        let (client, transport, _) = scripted_client("/upload");
        transport.respond_empty("POST /api/photo/sea.png?tags=sea, sky&description=blue", StatusCode::OK);

        let request = UploadRequest {
            name: "sea.png".to_string(),
            content_type: "image/png".to_string(),
            data: vec![0x89, 0x50],
            metadata: MetadataCreationRequest {
                tags: "sea, sky".to_string(),
                description: "blue".to_string(),
            },
        };

        let name = client.upload_photo(&request).await.unwrap();
        assert_eq!(name, "sea.png");

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(
            sent.body,
            RequestBody::Binary {
                content_type: "image/png".to_string(),
                data: vec![0x89, 0x50],
            }
        );
    }

    #[tokio::test]
    async fn test_update_sends_json_body() {
        let (client, transport, _) = scripted_client("/");
        transport.respond_empty("PUT /api/photo/x.png", StatusCode::OK);

        let update = MetadataUpdateRequest::from_tag_list("a, b", "new");
        client.update_photo("x.png", &update).await.unwrap();

        match &transport.requests()[0].body {
            RequestBody::Json(value) => {
                assert_eq!(value["tags"], json!(["a", "b"]));
                assert_eq!(value["description"], "new");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_decodes_results() {
        let (client, transport, _) = scripted_client("/search");
        transport.respond(
            "POST /api/search",
            StatusCode::OK,
            json!([metadata_json("found.png")]),
        );

        let results = client
            .search(&SearchRequest {
                token: "cat".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(results[0].name, "found.png");
    }
}
