// Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use cachegate::interceptor::{EntityService, Identified};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: u64,
    pub title: String,
}

impl Identified for Article {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArticleError {
    #[error("article {0} not found")]
    NotFound(u64),
    #[error("article backend unavailable")]
    Unavailable,
}

/// In-memory article backend that counts every call.
#[derive(Default)]
pub struct ArticleService {
    rows: Mutex<FxHashMap<u64, String>>,
    next_id: AtomicU64,
    gets: AtomicUsize,
    writes: AtomicUsize,
    deletes: AtomicUsize,
    failing: Mutex<bool>,
    get_gate: Option<Arc<Barrier>>,
}

impl ArticleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `get` waits on `gate` before answering.
    pub fn gated(gate: Arc<Barrier>) -> Self {
        Self {
            get_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn seed(&self, id: u64, title: &str) {
        self.rows.lock().insert(id, title.to_string());
    }

    /// Changes the backing row without going through the cache.
    pub fn overwrite_behind_cache(&self, id: u64, title: &str) {
        self.seed(id, title);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), ArticleError> {
        if *self.failing.lock() {
            Err(ArticleError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl EntityService for ArticleService {
    type Id = u64;
    type Input = String;
    type Output = Article;
    type Error = ArticleError;

    fn get(&self, id: &u64) -> Result<Article, ArticleError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.get_gate {
            gate.wait();
        }
        self.check_available()?;
        let rows = self.rows.lock();
        let title = rows.get(id).ok_or(ArticleError::NotFound(*id))?;
        Ok(Article {
            id: *id,
            title: title.clone(),
        })
    }

    fn create(&self, title: String) -> Result<Article, ArticleError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.lock().insert(id, title.clone());
        Ok(Article { id, title })
    }

    fn update(&self, id: &u64, title: String) -> Result<Article, ArticleError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut rows = self.rows.lock();
        let row = rows.get_mut(id).ok_or(ArticleError::NotFound(*id))?;
        *row = title.clone();
        Ok(Article { id: *id, title })
    }

    fn delete(&self, id: &u64) -> Result<(), ArticleError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.rows.lock().remove(id);
        Ok(())
    }
}

/// A second entity kind whose ids overlap with articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub article: u64,
    pub body: String,
}

impl Identified for Comment {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

/// In-memory comment backend keyed by comment id.
#[derive(Default)]
pub struct CommentService {
    rows: Mutex<FxHashMap<u64, (u64, String)>>,
    gets: AtomicUsize,
}

impl CommentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, id: u64, article: u64, body: &str) {
        self.rows.lock().insert(id, (article, body.to_string()));
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl EntityService for CommentService {
    type Id = u64;
    type Input = (u64, String);
    type Output = Comment;
    type Error = ArticleError;

    fn get(&self, id: &u64) -> Result<Comment, ArticleError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock();
        let (article, body) = rows.get(id).ok_or(ArticleError::NotFound(*id))?;
        Ok(Comment {
            id: *id,
            article: *article,
            body: body.clone(),
        })
    }

    fn create(&self, (article, body): (u64, String)) -> Result<Comment, ArticleError> {
        let mut rows = self.rows.lock();
        let id = rows.len() as u64 + 1;
        rows.insert(id, (article, body.clone()));
        Ok(Comment { id, article, body })
    }

    fn update(&self, id: &u64, (article, body): (u64, String)) -> Result<Comment, ArticleError> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(id).ok_or(ArticleError::NotFound(*id))?;
        *row = (article, body.clone());
        Ok(Comment { id: *id, article, body })
    }

    fn delete(&self, id: &u64) -> Result<(), ArticleError> {
        self.rows.lock().remove(id);
        Ok(())
    }
}
