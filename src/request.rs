use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TopPollsParams {
    pub limit: Option<i64>,
}
