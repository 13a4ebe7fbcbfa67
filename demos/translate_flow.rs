//! Translates a list of words with the cached `Translate` task.
//!
//! The translator here is an offline glossary that answers with HTML
//! entities and fails every other call, so retries and unescaping show up
//! in the logs.
//!
//! Try:
//! ```text
//! RUST_LOG=debug cargo run --example translate_flow -- "words=[water, bread, water]"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;
use typeflow::prelude::*;
use typeflow::serde_json::json;
use typeflow::tasks::translate::TranslateParams;
use typeflow::tasks::{Translate, Translator};

// ============================================================================
// Translator
// ============================================================================

struct Glossary {
    calls: AtomicUsize,
}

impl Translator for Glossary {
    fn translate(&self, text: &str, target_language_code: &str) -> Result<String, WorkError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            return Err("glossary temporarily unavailable".into());
        }
        let reply = match (target_language_code, text) {
            ("fr", "water") => "l&#39;eau",
            ("fr", "bread") => "le pain",
            ("fr", "fish & chips") => "poisson &amp; frites",
            _ => text,
        };
        Ok(reply.to_string())
    }
}

// ============================================================================
// Flow
// ============================================================================

#[derive(Deserialize)]
struct WordsParams {
    words: Vec<String>,
    target_language_code: String,
}

impl Parameters for WordsParams {
    fn declare(params: Fields) -> Fields {
        params
            .required::<Vec<String>>("words")
            .with_default("target_language_code", "fr".to_string())
    }
}

struct TranslateWords {
    translate: Task<Translate<Glossary>>,
}

impl WorkLogic for TranslateWords {
    type Params = WordsParams;
    type Output = BTreeMap<String, String>;

    fn name(&self) -> &str {
        "translate-words"
    }

    fn run(&self, params: WordsParams) -> Result<Returned<Self::Output>, WorkError> {
        let mut translations = json!({});
        for word in params.words {
            let translated = self.translate.call(TranslateParams {
                text: word.clone(),
                target_language_code: params.target_language_code.clone(),
            })?;
            translations[word.as_str()] = json!(translated);
        }
        println!("{translations:#}");
        // Handed back loosely typed; checked against the declared map type.
        Ok(Returned::Fields(translations))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let glossary = Glossary {
        calls: AtomicUsize::new(0),
    };
    let flow = Flow::new(TranslateWords {
        translate: Task::new(Translate::new(glossary))?,
    })?;

    let mut app = App::new("translator");
    app.register(flow)?;
    std::process::exit(app.main());
}
