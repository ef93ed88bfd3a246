use super::{IOffChainProposalSource, OffChainProposal};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const PROPOSALS_QUERY: &str = r#"
query Proposals($space: String!, $first: Int!) {
    proposals(first: $first, skip: 0, where: {space_in: [$space]}, orderBy: "created", orderDirection: desc) {
        id
        title
        start
        end
        created
    }
}
"#;

#[derive(Debug, Serialize)]
struct ProposalsVariables<'a> {
    space: &'a str,
    first: usize,
}

#[derive(Debug, Serialize)]
struct GraphQLRequest<'a> {
    query: &'static str,
    variables: ProposalsVariables<'a>,
}

#[derive(Debug, Deserialize)]
struct ProposalsData {
    #[serde(default)]
    proposals: Vec<OffChainProposal>,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    data: Option<ProposalsData>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

/// Client for the Snapshot GraphQL hub
pub struct SnapshotClient {
    client: Client,
    graphql_url: String,
}

impl SnapshotClient {
    pub fn new(graphql_url: String) -> Self {
        Self {
            client: Client::new(),
            graphql_url,
        }
    }
}

#[async_trait::async_trait]
impl IOffChainProposalSource for SnapshotClient {
    async fn latest_proposals(
        &self,
        space: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<OffChainProposal>> {
        let body = GraphQLRequest {
            query: PROPOSALS_QUERY,
            variables: ProposalsVariables {
                space,
                first: limit,
            },
        };
        let res: GraphQLResponse = self
            .client
            .post(&self.graphql_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(errors) = res.errors {
            anyhow::bail!("Snapshot API returned errors: {}", errors);
        }
        Ok(res.data.map(|d| d.proposals).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_latest_proposals() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"variables": {"space": "gov.eth", "first": 3}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"proposals": [
                    {"id": "0x2", "title": "Second", "start": 200, "end": 300, "created": 150},
                    {"id": "0x1", "title": "First", "start": 100, "end": 200, "created": 50}
                ]}
            })))
            .mount(&server)
            .await;

        let client = SnapshotClient::new(server.uri());
        let proposals = client.latest_proposals("gov.eth", 3).await.unwrap();
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].id, "0x2");
        assert_eq!(proposals[1].start, 100);
    }

    #[tokio::test]
    async fn graphql_errors_fail_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{"message": "Unknown space"}]
            })))
            .mount(&server)
            .await;

        let client = SnapshotClient::new(server.uri());
        let err = client.latest_proposals("nope.eth", 3).await.unwrap_err();
        assert!(err.to_string().contains("Unknown space"));
    }
}
