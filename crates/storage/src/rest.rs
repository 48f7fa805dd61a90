//! REST adapter for the list-backed data service.
//!
//! Questions are read from one list and scores from another. Both are
//! filtered with OData `$filter` expressions on their composite keys. Both
//! upserts look up the existing item first and then either add a new item
//! or merge into the existing one.

use std::time::Duration;

use lms_core::model::{AnswerSet, LearningKey, ScoreKey, ScoreRecord};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::repository::{
    QuestionBankRepository, QuestionRow, ScoreRepository, StorageError, UpsertOutcome,
};

pub const QUESTION_LIST: &str = "LMSQuestionAndAnswer";
pub const SCORE_LIST: &str = "LMSLearningScore";

const ACCEPT: &str = "application/json;odata=nometadata";
const PAGE_SIZE: u32 = 2000;

const QUESTION_FIELDS: &str = "ID,Question,QuestionType,Option1,Option2,Option3,Option4,Answer,LearningType,LearningId,PhaseDuration";
const SCORE_FIELDS: &str = "Id,LearningId,LearningType,TestCandidateId,TestScore,Status,TestValue";

#[derive(Clone, Debug)]
pub struct ListStoreConfig {
    pub site_url: Url,
    pub bearer_token: Option<String>,
    pub question_list: String,
    pub score_list: String,
    pub timeout: Duration,
}

impl ListStoreConfig {
    /// Config for a site with the default list names.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if `site_url` is not an absolute URL.
    pub fn new(site_url: &str) -> Result<Self, StorageError> {
        let mut site_url =
            Url::parse(site_url).map_err(|e| StorageError::Connection(e.to_string()))?;
        if !site_url.path().ends_with('/') {
            let path = format!("{}/", site_url.path());
            site_url.set_path(&path);
        }
        Ok(Self {
            site_url,
            bearer_token: None,
            question_list: QUESTION_LIST.to_owned(),
            score_list: SCORE_LIST.to_owned(),
            timeout: Duration::from_secs(30),
        })
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

#[derive(Clone)]
pub struct ListStoreClient {
    client: Client,
    config: ListStoreConfig,
}

impl ListStoreClient {
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the HTTP client cannot be built.
    pub fn new(config: ListStoreConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, ACCEPT);
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_items<T>(
        &self,
        list: &str,
        filter: &str,
        select: &str,
    ) -> Result<Vec<T>, StorageError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut url = items_url(&self.config.site_url, list)?;
        url.query_pairs_mut()
            .append_pair("$filter", filter)
            .append_pair("$select", select)
            .append_pair("$top", &PAGE_SIZE.to_string());

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(transport)?;
        let body: ItemsEnvelope<T> = check(response)?.json().await.map_err(transport)?;
        Ok(body.value)
    }

    async fn find_question_item(&self, row: &QuestionRow) -> Result<Option<u64>, StorageError> {
        let filter = format!("ID eq {} and {}", row.id, question_filter(&row.learning_key()));
        let items: Vec<QuestionItem> = self
            .get_items(&self.config.question_list, &filter, "ID")
            .await?;
        Ok(items.into_iter().find_map(|item| item.id))
    }

    async fn write_item<B: Serialize + ?Sized>(
        &self,
        write: ItemWrite,
        body: &B,
    ) -> Result<UpsertOutcome, StorageError> {
        let outcome = write.outcome();
        let request = match write {
            ItemWrite::Add(url) => self.client.post(url),
            ItemWrite::Merge(url) => self
                .client
                .post(url)
                .header("X-HTTP-Method", "MERGE")
                .header("IF-MATCH", "*"),
        };
        let response = self
            .authorize(request)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        check(response)?;
        Ok(outcome)
    }

    async fn find_score_item(&self, key: &ScoreKey) -> Result<Option<ScoreItem>, StorageError> {
        let items: Vec<ScoreItem> = self
            .get_items(&self.config.score_list, &score_filter(key), SCORE_FIELDS)
            .await?;
        if items.len() > 1 {
            tracing::warn!(key = %key, count = items.len(), "duplicate score items for key");
        }
        Ok(items.into_iter().next())
    }
}

#[async_trait::async_trait]
impl QuestionBankRepository for ListStoreClient {
    async fn fetch_questions(&self, key: &LearningKey) -> Result<Vec<QuestionRow>, StorageError> {
        let items: Vec<QuestionItem> = self
            .get_items(&self.config.question_list, &question_filter(key), QUESTION_FIELDS)
            .await?;
        items.into_iter().map(|item| item.into_row(key)).collect()
    }

    /// Merges into the item with `row.id` when the learning item has one.
    /// Otherwise adds a new item, whose id is assigned by the list.
    async fn upsert_question(&self, row: &QuestionRow) -> Result<(), StorageError> {
        let existing = self.find_question_item(row).await?;
        let write = item_write(&self.config.site_url, &self.config.question_list, existing)?;
        let outcome = self.write_item(write, &NewQuestionItem::from(row)).await?;
        tracing::debug!(
            learning = %row.learning_key(),
            row = row.id,
            ?outcome,
            "wrote question item"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl ScoreRepository for ListStoreClient {
    async fn fetch_score(&self, key: &ScoreKey) -> Result<Option<ScoreRecord>, StorageError> {
        self.find_score_item(key)
            .await?
            .map(|item| item.into_record(key))
            .transpose()
    }

    async fn upsert_score(&self, record: &ScoreRecord) -> Result<UpsertOutcome, StorageError> {
        let key = record.key();
        let body = ScoreFields::from_record(record)?;
        let existing = self.find_score_item(&key).await?.and_then(|item| item.id());
        let write = item_write(&self.config.site_url, &self.config.score_list, existing)?;
        let outcome = self.write_item(write, &body).await?;
        tracing::debug!(key = %key, ?outcome, "wrote score item");
        Ok(outcome)
    }
}

// ─── WIRE TYPES ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ItemsEnvelope<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QuestionItem {
    #[serde(rename = "ID", alias = "Id")]
    id: Option<u64>,
    question: Option<String>,
    question_type: Option<String>,
    option1: Option<String>,
    option2: Option<String>,
    option3: Option<String>,
    option4: Option<String>,
    answer: Option<String>,
    phase_duration: Option<String>,
}

impl QuestionItem {
    fn into_row(self, key: &LearningKey) -> Result<QuestionRow, StorageError> {
        let id = self
            .id
            .ok_or_else(|| StorageError::Serialization("question item without id".into()))?;
        Ok(QuestionRow {
            id,
            learning_type: key.learning_type,
            learning_id: key.learning_id.clone(),
            prompt: self.question,
            options: [self.option1, self.option2, self.option3, self.option4],
            answer: self.answer,
            question_type: self.question_type,
            phase_duration: self.phase_duration,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct NewQuestionItem<'a> {
    learning_type: &'a str,
    learning_id: &'a str,
    question: Option<&'a str>,
    question_type: Option<&'a str>,
    option1: Option<&'a str>,
    option2: Option<&'a str>,
    option3: Option<&'a str>,
    option4: Option<&'a str>,
    answer: Option<&'a str>,
    phase_duration: Option<&'a str>,
}

impl<'a> From<&'a QuestionRow> for NewQuestionItem<'a> {
    fn from(row: &'a QuestionRow) -> Self {
        let [o1, o2, o3, o4] = &row.options;
        Self {
            learning_type: row.learning_type.as_str(),
            learning_id: row.learning_id.as_str(),
            question: row.prompt.as_deref(),
            question_type: row.question_type.as_deref(),
            option1: o1.as_deref(),
            option2: o2.as_deref(),
            option3: o3.as_deref(),
            option4: o4.as_deref(),
            answer: row.answer.as_deref(),
            phase_duration: row.phase_duration.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScoreItem {
    #[serde(rename = "Id", alias = "ID")]
    id: Option<u64>,
    test_score: Option<f64>,
    status: Option<String>,
    test_value: Option<String>,
}

impl ScoreItem {
    fn id(&self) -> Option<u64> {
        self.id
    }

    fn into_record(self, key: &ScoreKey) -> Result<ScoreRecord, StorageError> {
        let answers: AnswerSet = match self.test_value.as_deref().map(str::trim) {
            None | Some("") => AnswerSet::new(),
            Some(raw) => serde_json::from_str(raw).map_err(ser)?,
        };
        let status = self
            .status
            .as_deref()
            .ok_or_else(|| StorageError::Serialization("score item without status".into()))?
            .parse()
            .map_err(ser)?;
        let score = score_from_f64(self.test_score.unwrap_or(0.0))?;
        Ok(ScoreRecord::new(key.clone(), score, status, answers))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ScoreFields {
    learning_id: String,
    learning_type: &'static str,
    test_candidate_id: u64,
    test_score: u32,
    status: &'static str,
    test_value: String,
}

impl ScoreFields {
    fn from_record(record: &ScoreRecord) -> Result<Self, StorageError> {
        Ok(Self {
            learning_id: record.learning_id.as_str().to_owned(),
            learning_type: record.learning_type.as_str(),
            test_candidate_id: record.candidate_id.value(),
            test_score: record.score,
            status: record.status.as_str(),
            test_value: serde_json::to_string(&record.answers).map_err(ser)?,
        })
    }
}

// ─── HELPERS ───────────────────────────────────────────────────────────────────

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn transport(e: reqwest::Error) -> StorageError {
    if e.is_decode() {
        StorageError::Serialization(e.to_string())
    } else {
        StorageError::Connection(e.to_string())
    }
}

fn check(response: Response) -> Result<Response, StorageError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        reqwest::StatusCode::NOT_FOUND => Err(StorageError::NotFound),
        reqwest::StatusCode::CONFLICT | reqwest::StatusCode::PRECONDITION_FAILED => {
            Err(StorageError::Conflict)
        }
        status => Err(StorageError::Connection(format!("list store returned {status}"))),
    }
}

/// How an upsert reaches the list: a new item, or a merge into an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemWrite {
    Add(Url),
    Merge(Url),
}

impl ItemWrite {
    fn outcome(&self) -> UpsertOutcome {
        match self {
            ItemWrite::Add(_) => UpsertOutcome::Inserted,
            ItemWrite::Merge(_) => UpsertOutcome::Updated,
        }
    }
}

fn item_write(site: &Url, list: &str, existing: Option<u64>) -> Result<ItemWrite, StorageError> {
    match existing {
        Some(item_id) => item_url(site, list, item_id).map(ItemWrite::Merge),
        None => items_url(site, list).map(ItemWrite::Add),
    }
}

// Range and integrality are checked before the cast.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn score_from_f64(raw: f64) -> Result<u32, StorageError> {
    if raw.is_finite() && raw >= 0.0 && raw <= f64::from(u32::MAX) && raw.fract() == 0.0 {
        Ok(raw as u32)
    } else {
        Err(StorageError::Serialization(format!("invalid score: {raw}")))
    }
}

/// Quote a string literal for an OData filter. Embedded single quotes are doubled.
#[must_use]
pub fn odata_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

#[must_use]
pub fn question_filter(key: &LearningKey) -> String {
    format!(
        "LearningType eq {} and LearningId eq {}",
        odata_literal(key.learning_type.as_str()),
        odata_literal(key.learning_id.as_str()),
    )
}

#[must_use]
pub fn score_filter(key: &ScoreKey) -> String {
    format!(
        "LearningId eq {} and LearningType eq {} and TestCandidateId eq {}",
        odata_literal(key.learning_id.as_str()),
        odata_literal(key.learning_type.as_str()),
        key.candidate_id.value(),
    )
}

fn list_path(list: &str) -> String {
    format!("_api/web/lists/getbytitle({})/items", odata_literal(list))
}

fn items_url(site: &Url, list: &str) -> Result<Url, StorageError> {
    site.join(&list_path(list))
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn item_url(site: &Url, list: &str, item_id: u64) -> Result<Url, StorageError> {
    site.join(&format!("{}({item_id})", list_path(list)))
        .map_err(|e| StorageError::Connection(e.to_string()))
}
