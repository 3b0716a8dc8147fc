//! Question source backed by a remote quiz server.
//!
//! A question is fetched from its URL and carries the URL its answer is
//! posted to. A correct answer returns the URL of the next question; a
//! wrong one is reported with status 400. Requests block the event loop,
//! so every call is bounded by [`REQUEST_TIMEOUT`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ureq::Agent;

use super::quiz::{Question, QuestionSource, QuizError, Verdict};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const WRONG_ANSWER_STATUS: u16 = 400;

#[derive(Debug, Deserialize)]
struct RemoteQuestion {
    question: String,
    #[serde(default)]
    alternatives: BTreeMap<String, String>,
    #[serde(rename = "nextURL")]
    next_url: String,
}

#[derive(Debug, Deserialize)]
struct RemoteAnswer {
    #[serde(default, rename = "nextURL")]
    next_url: Option<String>,
}

#[derive(Serialize)]
struct AnswerBody<'a> {
    answer: &'a str,
}

pub struct HttpQuestions {
    agent: Agent,
    /// Question URLs by the ids handed out to the app.
    questions: BTreeMap<u32, String>,
    /// Answer URLs of fetched questions.
    answers: BTreeMap<u32, String>,
    next_id: u32,
}

impl std::fmt::Debug for HttpQuestions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpQuestions")
            .field("questions", &self.questions)
            .field("answers", &self.answers)
            .finish_non_exhaustive()
    }
}

impl HttpQuestions {
    pub fn new(start_url: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            questions: BTreeMap::from([(1, start_url.into())]),
            answers: BTreeMap::new(),
            next_id: 2,
        }
    }

    fn register(&mut self, url: String) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.questions.insert(id, url);
        id
    }
}

/// Turn a question document into a [`Question`] and its answer URL.
fn parse_question(id: u32, body: &str) -> Result<(Question, String), QuizError> {
    let remote: RemoteQuestion = serde_json::from_str(body)?;
    let question = Question {
        id,
        text: remote.question,
        alternatives: remote.alternatives.into_iter().collect(),
    };
    Ok((question, remote.next_url))
}

/// Interpret the reply to an answer post. `Some(url)` in a correct verdict
/// is the next question's URL.
fn parse_answer(status: u16, body: &str) -> Result<(Verdict, Option<String>), QuizError> {
    match status {
        WRONG_ANSWER_STATUS => Ok((Verdict::Wrong, None)),
        200..=299 => {
            let remote: RemoteAnswer = serde_json::from_str(body)?;
            Ok((Verdict::Correct { next: None }, remote.next_url))
        }
        other => Err(QuizError::Status(other)),
    }
}

impl QuestionSource for HttpQuestions {
    fn first(&self) -> u32 {
        1
    }

    fn fetch(&mut self, id: u32) -> Result<Question, QuizError> {
        let url = self
            .questions
            .get(&id)
            .ok_or(QuizError::UnknownQuestion(id))?;
        let mut response = self.agent.get(url.as_str()).call()?;
        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            return Err(QuizError::Status(status));
        }
        let body = response.body_mut().read_to_string()?;
        let (question, answer_url) = parse_question(id, &body)?;
        self.answers.insert(id, answer_url);
        tracing::debug!(id, "fetched remote question");
        Ok(question)
    }

    fn submit(&mut self, id: u32, answer: &str) -> Result<Verdict, QuizError> {
        let url = self
            .answers
            .get(&id)
            .ok_or(QuizError::UnknownQuestion(id))?;
        let payload = serde_json::to_string(&AnswerBody { answer })?;
        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(payload.as_str())?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        match parse_answer(status, &body)? {
            (Verdict::Correct { .. }, Some(next_url)) => Ok(Verdict::Correct {
                next: Some(self.register(next_url)),
            }),
            (verdict, _) => Ok(verdict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_document_with_alternatives() {
        let body = r#"{
            "id": 21,
            "question": "Pick one",
            "alternatives": { "alt2": "B", "alt1": "A" },
            "limit": 10,
            "nextURL": "https://quiz.example/answer/21"
        }"#;
        let (question, answer_url) = parse_question(3, body).unwrap();
        assert_eq!(question.id, 3);
        assert_eq!(question.text, "Pick one");
        assert_eq!(
            question.alternatives,
            vec![("alt1".into(), "A".into()), ("alt2".into(), "B".into())]
        );
        assert_eq!(answer_url, "https://quiz.example/answer/21");
    }

    #[test]
    fn free_text_question_without_answer_url_is_malformed() {
        let err = parse_question(1, r#"{ "id": 1, "question": "2+2?" }"#).unwrap_err();
        assert!(matches!(err, QuizError::Malformed(_)));
    }

    #[test]
    fn answer_statuses_map_to_verdicts() {
        let (verdict, next) = parse_answer(
            200,
            r#"{ "message": "Correct answer!", "nextURL": "https://quiz.example/question/2" }"#,
        )
        .unwrap();
        assert_eq!(verdict, Verdict::Correct { next: None });
        assert_eq!(next.as_deref(), Some("https://quiz.example/question/2"));

        let (verdict, next) = parse_answer(200, r#"{ "message": "Correct answer!" }"#).unwrap();
        assert_eq!(verdict, Verdict::Correct { next: None });
        assert!(next.is_none());

        let (verdict, _) = parse_answer(400, r#"{ "message": "Wrong answer! :(" }"#).unwrap();
        assert_eq!(verdict, Verdict::Wrong);

        assert!(matches!(parse_answer(503, ""), Err(QuizError::Status(503))));
    }

    #[test]
    fn submit_before_fetch_is_unknown() {
        let mut source = HttpQuestions::new("http://127.0.0.1:9/question/1");
        assert_eq!(source.first(), 1);
        assert!(matches!(
            source.submit(1, "4"),
            Err(QuizError::UnknownQuestion(1))
        ));
    }

    #[test]
    fn next_urls_get_fresh_ids() {
        let mut source = HttpQuestions::new("http://quiz.example/question/1");
        let a = source.register("http://quiz.example/question/2".into());
        let b = source.register("http://quiz.example/question/3".into());
        assert_eq!((a, b), (2, 3));
        assert_eq!(
            source.questions.get(&3).map(String::as_str),
            Some("http://quiz.example/question/3")
        );
    }
}
