//! Timed quiz with a persisted high-score table.
//!
//! Questions come from a [`QuestionSource`]. Each question links to the
//! next through the verdict of a correct answer, so a source decides the
//! length of a run; the app stops after [`QUIZ_TOTAL_QUESTIONS`] either way.
//! A wrong answer or a timeout ends the game.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use indoc::indoc;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Wrap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::clock::Interval;
use super::{AppContext, AppEvent, ButtonRow, HostedApp};
use crate::constants::{
    QUIZ_HIGH_SCORE_SLOTS, QUIZ_TIME_LIMIT_SECS, QUIZ_TOTAL_QUESTIONS, TICK_PERIOD,
};
use crate::ui::{UiFrame, safe_set_string};
use crate::view::{Marker, SectionLayout, ViewNode, ViewTemplate};
use crate::window::{Point, Size};

pub const HIGH_SCORES_KEY: &str = "quiz.high_scores";
pub const USERNAME_KEY: &str = "quiz.username";

pub fn template() -> ViewTemplate {
    ViewTemplate::new(Size::new(46, 16))
        .child(ViewNode::header([
            ViewNode::title("Quiz"),
            ViewNode::close_button("x"),
        ]))
        .child(ViewNode::section("status", Constraint::Length(1)))
        .child(ViewNode::section("body", Constraint::Min(6)))
        .child(ViewNode::section("feedback", Constraint::Length(2)))
        .child(ViewNode::section("actions", Constraint::Length(1)))
}

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("question set is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no question with id {0}")]
    UnknownQuestion(u32),
    #[error("quiz server request failed: {0}")]
    Http(#[from] ureq::Error),
    #[error("quiz server answered with status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: u32,
    pub text: String,
    /// `(key, label)` pairs; empty for a free-text question.
    pub alternatives: Vec<(String, String)>,
}

impl Question {
    pub fn is_multiple_choice(&self) -> bool {
        !self.alternatives.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct { next: Option<u32> },
    Wrong,
}

pub trait QuestionSource: std::fmt::Debug {
    fn first(&self) -> u32;

    fn fetch(&mut self, id: u32) -> Result<Question, QuizError>;

    fn submit(&mut self, id: u32, answer: &str) -> Result<Verdict, QuizError>;
}

const BUNDLED_QUESTIONS: &str = indoc! {r#"
    [
      { "id": 1, "question": "What is 2 + 2?", "answer": "4", "next": 2 },
      { "id": 2, "question": "Which planet is closest to the sun?",
        "alternatives": { "alt1": "Venus", "alt2": "Mercury", "alt3": "Mars" },
        "answer": "alt2", "next": 3 },
      { "id": 3, "question": "How many bits are in a byte?", "answer": "8", "next": 4 },
      { "id": 4, "question": "Which of these is a prime number?",
        "alternatives": { "alt1": "21", "alt2": "27", "alt3": "29", "alt4": "33" },
        "answer": "alt3", "next": 5 },
      { "id": 5, "question": "Name the HTTP status code for Not Found.", "answer": "404", "next": 6 },
      { "id": 6, "question": "What does CPU stand for?",
        "alternatives": { "alt1": "Central Processing Unit", "alt2": "Core Power Unit",
                          "alt3": "Computer Peripheral Unit" },
        "answer": "alt1", "next": 7 },
      { "id": 7, "question": "What is 7 * 6?", "answer": "42" }
    ]
"#};

#[derive(Debug, Clone, Deserialize)]
struct BundledQuestion {
    id: u32,
    question: String,
    #[serde(default)]
    alternatives: BTreeMap<String, String>,
    answer: String,
    #[serde(default)]
    next: Option<u32>,
}

/// Offline question set compiled into the binary.
#[derive(Debug, Clone)]
pub struct BundledQuestions {
    questions: Vec<BundledQuestion>,
}

impl Default for BundledQuestions {
    fn default() -> Self {
        Self::from_json(BUNDLED_QUESTIONS).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "bundled questions unavailable");
            Self {
                questions: Vec::new(),
            }
        })
    }
}

impl BundledQuestions {
    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        Ok(Self {
            questions: serde_json::from_str(json)?,
        })
    }

    fn get(&self, id: u32) -> Result<&BundledQuestion, QuizError> {
        self.questions
            .iter()
            .find(|q| q.id == id)
            .ok_or(QuizError::UnknownQuestion(id))
    }
}

impl QuestionSource for BundledQuestions {
    fn first(&self) -> u32 {
        self.questions.first().map_or(1, |q| q.id)
    }

    fn fetch(&mut self, id: u32) -> Result<Question, QuizError> {
        let q = self.get(id)?;
        Ok(Question {
            id,
            text: q.question.clone(),
            alternatives: q
                .alternatives
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }

    fn submit(&mut self, id: u32, answer: &str) -> Result<Verdict, QuizError> {
        let q = self.get(id)?;
        if q.answer.eq_ignore_ascii_case(answer.trim()) {
            Ok(Verdict::Correct { next: q.next })
        } else {
            Ok(Verdict::Wrong)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScore {
    pub username: String,
    /// Total run time in milliseconds.
    pub time: u64,
}

/// Insert `entry`, keep the table sorted by time and cut it to the top slots.
pub fn record_high_score(mut scores: Vec<HighScore>, entry: HighScore) -> Vec<HighScore> {
    scores.push(entry);
    scores.sort_by_key(|score| score.time);
    scores.truncate(QUIZ_HIGH_SCORE_SLOTS);
    scores
}

#[derive(Debug)]
struct Asking {
    question: Question,
    selected: Option<usize>,
    text: String,
    time_left: u32,
    clock: Option<Interval>,
}

#[derive(Debug)]
enum Phase {
    Username { input: String },
    Asking(Asking),
    Over { won: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Start,
    Submit,
    Restart,
    HighScores,
}

#[derive(Debug)]
pub struct QuizApp {
    ctx: AppContext,
    source: Box<dyn QuestionSource>,
    now: Instant,
    shown: bool,
    phase: Phase,
    username: String,
    score: u32,
    number: u32,
    started_at: Instant,
    feedback: String,
    show_scores: bool,
    buttons: ButtonRow<Action>,
    choice_hits: Vec<(Rect, usize)>,
}

impl QuizApp {
    pub fn new(ctx: AppContext) -> Self {
        Self::with_source(ctx, Box::new(BundledQuestions::default()))
    }

    pub fn with_source(ctx: AppContext, source: Box<dyn QuestionSource>) -> Self {
        let remembered: String = ctx.store.get(USERNAME_KEY).unwrap_or_default();
        let now = Instant::now();
        Self {
            ctx,
            source,
            now,
            shown: false,
            phase: Phase::Username { input: remembered },
            username: String::new(),
            score: 0,
            number: 1,
            started_at: now,
            feedback: String::new(),
            show_scores: false,
            buttons: ButtonRow::default(),
            choice_hits: Vec::new(),
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn question_number(&self) -> u32 {
        self.number
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn current_question(&self) -> Option<&Question> {
        match &self.phase {
            Phase::Asking(asking) => Some(&asking.question),
            _ => None,
        }
    }

    pub fn time_left(&self) -> Option<u32> {
        match &self.phase {
            Phase::Asking(asking) => Some(asking.time_left),
            _ => None,
        }
    }

    /// `Some(won)` once the game ended.
    pub fn outcome(&self) -> Option<bool> {
        match self.phase {
            Phase::Over { won } => Some(won),
            _ => None,
        }
    }

    pub fn high_scores(&self) -> Vec<HighScore> {
        self.ctx.store.get(HIGH_SCORES_KEY).unwrap_or_default()
    }

    pub fn type_text(&mut self, text: &str) {
        match &mut self.phase {
            Phase::Username { input } => input.push_str(text),
            Phase::Asking(asking) if !asking.question.is_multiple_choice() => {
                asking.text.push_str(text)
            }
            _ => {}
        }
    }

    pub fn select(&mut self, index: usize) {
        if let Phase::Asking(asking) = &mut self.phase
            && index < asking.question.alternatives.len()
        {
            asking.selected = Some(index);
        }
    }

    /// Accept the typed username and start the first run.
    pub fn confirm_username(&mut self) {
        let Phase::Username { input } = &self.phase else {
            return;
        };
        let username = input.trim().to_string();
        if username.is_empty() {
            self.feedback = String::from("Please enter a username");
            return;
        }
        if let Err(err) = self.ctx.store.set(USERNAME_KEY, &username) {
            tracing::warn!(error = %err, "failed to remember quiz username");
        }
        self.username = username;
        self.start();
    }

    fn start(&mut self) {
        self.score = 0;
        self.number = 1;
        self.feedback.clear();
        self.show_scores = false;
        self.started_at = self.now;
        let first = self.source.first();
        self.load(first);
    }

    fn load(&mut self, id: u32) {
        match self.source.fetch(id) {
            Ok(question) => {
                self.phase = Phase::Asking(Asking {
                    question,
                    selected: None,
                    text: String::new(),
                    time_left: QUIZ_TIME_LIMIT_SECS,
                    clock: Some(Interval::start(self.now, TICK_PERIOD)),
                });
            }
            Err(err) => {
                tracing::warn!(window = %self.ctx.frame, error = %err, "failed to load question");
                self.feedback = String::from("Error loading question.");
                self.phase = Phase::Over { won: false };
            }
        }
    }

    pub fn submit(&mut self) {
        let Phase::Asking(asking) = &mut self.phase else {
            return;
        };
        let answer = if asking.question.is_multiple_choice() {
            asking
                .selected
                .and_then(|idx| asking.question.alternatives.get(idx))
                .map(|(key, _)| key.clone())
                .unwrap_or_default()
        } else {
            asking.text.trim().to_string()
        };
        if answer.is_empty() {
            self.feedback = String::from("Please select or enter an answer");
            return;
        }
        self.feedback.clear();
        asking.clock = None;
        let id = asking.question.id;
        match self.source.submit(id, &answer) {
            Ok(Verdict::Wrong) => self.end(false),
            Ok(Verdict::Correct { next: Some(next) }) if self.number < QUIZ_TOTAL_QUESTIONS => {
                self.score += 1;
                self.number += 1;
                self.load(next);
            }
            Ok(Verdict::Correct { .. }) => {
                self.score += 1;
                self.end(true);
            }
            Err(err) => {
                tracing::warn!(window = %self.ctx.frame, error = %err, "failed to submit answer");
                self.feedback = String::from("Error submitting answer.");
            }
        }
    }

    fn end(&mut self, won: bool) {
        self.phase = Phase::Over { won };
        if won {
            self.feedback = format!(
                "Congratulations {}! YOU WON! Your score is {}/{}.",
                self.username, self.score, QUIZ_TOTAL_QUESTIONS
            );
            let elapsed = self.now.saturating_duration_since(self.started_at);
            let entry = HighScore {
                username: self.username.clone(),
                time: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            };
            let scores = record_high_score(self.high_scores(), entry);
            if let Err(err) = self.ctx.store.set(HIGH_SCORES_KEY, &scores) {
                tracing::warn!(error = %err, "failed to store high scores");
            }
            self.show_scores = true;
        } else {
            let prefix = if self.feedback.is_empty() {
                String::new()
            } else {
                format!("{} ", self.feedback)
            };
            self.feedback = format!(
                "{prefix}GAME OVER! Your score is {}/{}.",
                self.score, QUIZ_TOTAL_QUESTIONS
            );
        }
        tracing::info!(window = %self.ctx.frame, won, score = self.score, "quiz ended");
    }

    pub fn restart(&mut self) {
        if matches!(self.phase, Phase::Over { .. }) {
            self.start();
        }
    }

    pub fn show_high_scores(&mut self) {
        if matches!(self.phase, Phase::Over { .. }) {
            self.show_scores = true;
        }
    }

    fn timeout(&mut self) {
        self.feedback = String::from("You ran out of time!");
        self.end(false);
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Start => self.confirm_username(),
            Action::Submit => self.submit(),
            Action::Restart => self.restart(),
            Action::HighScores => self.show_high_scores(),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match &mut self.phase {
            Phase::Username { input } => match key.code {
                KeyCode::Enter => self.confirm_username(),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => return false,
            },
            Phase::Asking(asking) if asking.question.is_multiple_choice() => {
                let count = asking.question.alternatives.len();
                match key.code {
                    KeyCode::Enter => self.submit(),
                    KeyCode::Up => {
                        asking.selected = Some(asking.selected.map_or(0, |i| i.saturating_sub(1)))
                    }
                    KeyCode::Down => {
                        asking.selected =
                            Some(asking.selected.map_or(0, |i| (i + 1).min(count - 1)))
                    }
                    KeyCode::Char(c) if c.is_ascii_digit() => {
                        let idx = c.to_digit(10).map_or(0, |d| d as usize);
                        if (1..=count).contains(&idx) {
                            asking.selected = Some(idx - 1);
                        }
                    }
                    _ => return false,
                }
            }
            Phase::Asking(asking) => match key.code {
                KeyCode::Enter => self.submit(),
                KeyCode::Backspace => {
                    asking.text.pop();
                }
                KeyCode::Char(c) => asking.text.push(c),
                _ => return false,
            },
            Phase::Over { .. } => match key.code {
                KeyCode::Char('r') | KeyCode::Enter => self.restart(),
                KeyCode::Char('h') => self.show_high_scores(),
                _ => return false,
            },
        }
        true
    }

    fn choice_at(&self, at: Point) -> Option<usize> {
        let (Ok(x), Ok(y)) = (u16::try_from(at.x), u16::try_from(at.y)) else {
            return None;
        };
        self.choice_hits
            .iter()
            .find(|(rect, _)| rect.contains((x, y).into()))
            .map(|(_, idx)| *idx)
    }

    fn render_body(&mut self, frame: &mut UiFrame<'_>, area: Rect, focused: bool) {
        self.choice_hits.clear();
        let cursor = if focused { "_" } else { "" };
        match &self.phase {
            Phase::Username { input } => {
                frame.render_widget(
                    Paragraph::new(vec![
                        Line::from("Enter your username:"),
                        Line::from(format!("> {input}{cursor}")),
                    ]),
                    area,
                );
            }
            Phase::Asking(asking) => {
                let text_area = Rect::new(area.x, area.y, area.width, area.height.min(2));
                frame.render_widget(
                    Paragraph::new(asking.question.text.as_str()).wrap(Wrap { trim: true }),
                    text_area,
                );
                let first_row = area.y.saturating_add(2);
                if asking.question.is_multiple_choice() {
                    for (idx, (_, label)) in asking.question.alternatives.iter().enumerate() {
                        let y = first_row.saturating_add(idx as u16);
                        if y >= area.bottom() {
                            break;
                        }
                        let mark = if asking.selected == Some(idx) { "(*)" } else { "( )" };
                        let text = format!("{mark} {}. {label}", idx + 1);
                        safe_set_string(frame.buffer_mut(), area, area.x, y, &text, Style::default());
                        self.choice_hits.push((Rect::new(area.x, y, area.width, 1), idx));
                    }
                } else if first_row < area.bottom() {
                    let text = format!("Answer: {}{cursor}", asking.text);
                    safe_set_string(frame.buffer_mut(), area, area.x, first_row, &text, Style::default());
                }
            }
            Phase::Over { .. } if self.show_scores => {
                let mut lines = vec![Line::styled(
                    "High scores",
                    Style::default().add_modifier(Modifier::BOLD),
                )];
                for (rank, score) in self.high_scores().iter().enumerate() {
                    let secs = Duration::from_millis(score.time).as_secs_f64();
                    lines.push(Line::from(format!(
                        "{}. {} - {secs:.2} seconds",
                        rank + 1,
                        score.username
                    )));
                }
                frame.render_widget(Paragraph::new(lines), area);
            }
            Phase::Over { .. } => {}
        }
    }
}

impl HostedApp for QuizApp {
    fn show(&mut self) {
        if !self.shown {
            self.shown = true;
            self.ctx.focus_self();
        }
    }

    fn dispose(&mut self) {
        if let Phase::Asking(asking) = &mut self.phase {
            asking.clock = None;
        }
    }

    fn handle_event(&mut self, event: &AppEvent) -> bool {
        match event {
            AppEvent::Activate {
                marker: Some(Marker::Close),
                ..
            } => {
                self.ctx.close_self();
                true
            }
            AppEvent::Activate { .. } => false,
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Click(at) => {
                if let Some(action) = self.buttons.hit(*at) {
                    self.apply(action);
                    true
                } else if let Some(idx) = self.choice_at(*at) {
                    self.select(idx);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        self.now = now;
        let Phase::Asking(asking) = &mut self.phase else {
            return;
        };
        let Some(clock) = &mut asking.clock else {
            return;
        };
        let fired = clock.elapsed(now);
        asking.time_left = asking.time_left.saturating_sub(fired);
        if fired > 0 && asking.time_left == 0 {
            asking.clock = None;
            self.timeout();
        }
    }

    fn render(&mut self, frame: &mut UiFrame<'_>, sections: &SectionLayout, focused: bool) {
        let status = match &self.phase {
            Phase::Asking(asking) => format!(
                "Question {}/{}  Time left: {}s",
                self.number, QUIZ_TOTAL_QUESTIONS, asking.time_left
            ),
            Phase::Over { won: false } if self.feedback.contains("out of time") => {
                String::from("Time is up!")
            }
            _ => String::new(),
        };
        frame.render_widget(Paragraph::new(status), sections.get("status"));
        self.render_body(frame, sections.get("body"), focused);
        frame.render_widget(
            Paragraph::new(self.feedback.as_str())
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(crate::theme::alert_fg())),
            sections.get("feedback"),
        );
        let actions: &[(&str, Action)] = match self.phase {
            Phase::Username { .. } => &[("Start Quiz", Action::Start)],
            Phase::Asking(_) => &[("Submit", Action::Submit)],
            Phase::Over { .. } if self.show_scores => &[("Restart", Action::Restart)],
            Phase::Over { .. } => &[
                ("Restart", Action::Restart),
                ("High Scores", Action::HighScores),
            ],
        };
        self.buttons.render(frame, sections.get("actions"), actions);
    }
}
