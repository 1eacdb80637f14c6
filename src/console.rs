//! Interactive console front end
//!
//! While typing, the best GeoDB match is shown inline (accept it with the right
//! arrow) and Tab lists every suggestion. The report is then printed to stdout
//! one day at a time.

use crate::geo::CityCompleter;
use crate::models::LocationCandidate;
use crate::report::ConsoleReport;
use crate::service::OutfitService;
use crate::{OutfitError, Result};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config as EditorConfig, Context, Editor, Helper};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info};

pub const CITY_PROMPT: &str = "Digite a cidade: ";

/// Byte offset where a candidate replacing the last `replace_len` typed characters starts
fn replacement_start(typed: &str, replace_len: usize) -> usize {
    if replace_len == 0 {
        return typed.len();
    }
    typed
        .trim_end()
        .char_indices()
        .rev()
        .nth(replace_len - 1)
        .map_or(0, |(index, _)| index)
}

/// Rest of `candidate` after the typed text, when the candidate extends it
fn inline_hint(typed: &str, candidate: &LocationCandidate) -> Option<String> {
    let query = &typed[replacement_start(typed, candidate.replace_len)..];
    let mut rest = candidate.display.chars();
    for typed_char in query.chars() {
        let shown = rest.next()?;
        if !shown.to_lowercase().eq(typed_char.to_lowercase()) {
            return None;
        }
    }
    let hint: String = rest.collect();
    (!hint.is_empty()).then_some(hint)
}

/// Line editor helper that completes city names
pub struct CityHelper {
    completer: Arc<dyn CityCompleter>,
    runtime: Handle,
}

impl CityHelper {
    pub fn new(completer: Arc<dyn CityCompleter>, runtime: Handle) -> Self {
        Self { completer, runtime }
    }
}

impl Completer for CityHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        let candidates = self.runtime.block_on(self.completer.suggest(typed));

        let Some(first) = candidates.first() else {
            return Ok((pos, Vec::new()));
        };
        let start = replacement_start(typed, first.replace_len);
        debug!("{} suggestions for {:?}", candidates.len(), typed);

        let pairs = candidates
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.display.clone(),
                replacement: candidate.display,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CityHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let candidates = self.runtime.block_on(self.completer.suggest(line));
        inline_hint(line, candidates.first()?)
    }
}

impl Highlighter for CityHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[2m{hint}\x1b[0m"))
    }
}

impl Validator for CityHelper {}

impl Helper for CityHelper {}

/// Ask for a city until a non-empty line is entered; `None` on Ctrl-C or Ctrl-D
pub fn prompt_city(completer: Arc<dyn CityCompleter>, runtime: Handle) -> Result<Option<String>> {
    let editor_config = EditorConfig::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut editor: Editor<CityHelper, DefaultHistory> = Editor::with_config(editor_config)
        .map_err(|e| OutfitError::general(format!("Failed to open the terminal: {e}")))?;
    editor.set_helper(Some(CityHelper::new(completer, runtime)));

    loop {
        match editor.readline(CITY_PROMPT) {
            Ok(line) => {
                let city = line.trim();
                if !city.is_empty() {
                    return Ok(Some(city.to_string()));
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
            Err(e) => {
                return Err(OutfitError::general(format!("Failed to read the city: {e}")));
            }
        }
    }
}

/// Prompt for a city and print its report
pub fn run(runtime: &Runtime, service: &OutfitService) -> Result<()> {
    let Some(city) = prompt_city(service.completer(), runtime.handle().clone())? else {
        info!("No city entered, exiting");
        return Ok(());
    };

    let mut sink = ConsoleReport::new(std::io::stdout());
    runtime.block_on(service.report(&city, &mut sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rstest::rstest;

    struct FixedCompleter;

    #[async_trait]
    impl CityCompleter for FixedCompleter {
        async fn suggest(&self, partial: &str) -> Vec<LocationCandidate> {
            let query = partial.trim();
            if query.chars().count() < 2 {
                return Vec::new();
            }
            vec![
                LocationCandidate::new("São Paulo", "Brazil", query),
                LocationCandidate::new("São Luís", "Brazil", query),
            ]
        }
    }

    #[rstest]
    #[case("Sao", 3, 0)]
    #[case("  Sao", 3, 2)]
    #[case("Sao ", 3, 0)]
    #[case("São", 3, 0)]
    #[case("Sao", 0, 3)]
    #[case("Sa", 5, 0)]
    fn test_replacement_start(
        #[case] typed: &str,
        #[case] replace_len: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(replacement_start(typed, replace_len), expected);
    }

    #[test]
    fn test_completion_replaces_typed_text() {
        let runtime = Runtime::new().unwrap();
        let helper = CityHelper::new(Arc::new(FixedCompleter), runtime.handle().clone());
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (start, pairs) = helper.complete("São", "São".len(), &ctx).unwrap();

        assert_eq!(start, 0);
        let replacements: Vec<_> = pairs.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(replacements, vec!["São Paulo, Brazil", "São Luís, Brazil"]);
    }

    #[rstest]
    #[case("Sã", Some("o Paulo, Brazil"))]
    #[case("são p", Some("aulo, Brazil"))]
    #[case("  São ", Some("Paulo, Brazil"))]
    #[case("Sao", None)]
    #[case("São Paulo, Brazil", None)]
    fn test_inline_hint(#[case] typed: &str, #[case] expected: Option<&str>) {
        let query = typed.trim();
        let candidate = LocationCandidate::new("São Paulo", "Brazil", query);
        assert_eq!(inline_hint(typed, &candidate).as_deref(), expected);
    }

    #[test]
    fn test_hint_shows_first_suggestion_while_typing() {
        let runtime = Runtime::new().unwrap();
        let helper = CityHelper::new(Arc::new(FixedCompleter), runtime.handle().clone());
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        assert_eq!(helper.hint("São P", "São P".len(), &ctx).as_deref(), Some("aulo, Brazil"));
        assert_eq!(helper.hint("S", 1, &ctx), None);
        // cursor inside the line
        assert_eq!(helper.hint("São P", 2, &ctx), None);
    }

    #[test]
    fn test_short_input_has_no_completions() {
        let runtime = Runtime::new().unwrap();
        let helper = CityHelper::new(Arc::new(FixedCompleter), runtime.handle().clone());
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (start, pairs) = helper.complete("S", 1, &ctx).unwrap();

        assert_eq!(start, 1);
        assert!(pairs.is_empty());
    }
}
