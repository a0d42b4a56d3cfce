use crate::models::{Candidate, ResolvedRecord};
use crate::prompt::{prompt_until, Operator, PromptError};

/// Picks the authoritative candidate, asking the operator only when there is a choice.
pub struct CandidateSelector;

impl CandidateSelector {
    /// Index of the preferred candidate, or `None` when there are no candidates.
    pub fn select(
        candidates: &[Candidate],
        operator: &mut dyn Operator,
    ) -> Result<Option<usize>, PromptError> {
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(Some(0)),
            count => {
                for (i, candidate) in candidates.iter().enumerate() {
                    operator.show(&format!("\n===== Result {:02} =====\n", i + 1));
                    operator.show(&candidate.render());
                }
                let question = format!("Select a preferred result [1-{count}]: ");
                let choice = prompt_until(operator, &question, "Invalid selection", |answer| {
                    answer
                        .parse::<usize>()
                        .ok()
                        .filter(|n| (1..=count).contains(n))
                })?;
                Ok(Some(choice - 1))
            }
        }
    }

    /// Select and mark the preferred candidate on the record.
    pub fn apply(
        record: &mut ResolvedRecord,
        operator: &mut dyn Operator,
    ) -> Result<Option<usize>, PromptError> {
        let selected = Self::select(&record.candidates, operator)?;
        match selected {
            Some(index) => {
                record.mark_preferred(index);
                let title = record.candidates[index].title().unwrap_or("(untitled)");
                operator.show(&format!("\nSelected result: {title}\n"));
            }
            None => log::warn!(
                "No database results for disc {}; it will be named by its fingerprint",
                record.fingerprint.hex()
            ),
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fingerprint;
    use crate::prompt::ScriptedOperator;

    fn titled(title: &str) -> Candidate {
        let mut c = Candidate::default();
        c.disc_info.insert("title".into(), title.into());
        c
    }

    fn record(titles: &[&str]) -> ResolvedRecord {
        let mut r = ResolvedRecord::new(Fingerprint::new(0xAB12CD, 3));
        r.candidates = titles.iter().map(|t| titled(t)).collect();
        r
    }

    #[test]
    fn test_no_candidates() {
        let mut r = record(&[]);
        let mut op = ScriptedOperator::new(&[]);
        assert_eq!(CandidateSelector::apply(&mut r, &mut op).unwrap(), None);
        assert!(op.asked.is_empty());
    }

    #[test]
    fn test_single_candidate_never_prompts() {
        let mut r = record(&["Test Album"]);
        let mut op = ScriptedOperator::new(&[]);
        assert_eq!(CandidateSelector::apply(&mut r, &mut op).unwrap(), Some(0));
        assert!(op.asked.is_empty());
        assert!(r.candidates[0].preferred);
    }

    #[test]
    fn test_multiple_candidates_reprompts() {
        let mut r = record(&["A", "B", "C"]);
        let mut op = ScriptedOperator::new(&["", "four", "0", "4", "2"]);
        assert_eq!(CandidateSelector::apply(&mut r, &mut op).unwrap(), Some(1));
        assert_eq!(op.asked.len(), 5);
        assert_eq!(op.asked[0], "Select a preferred result [1-3]: ");
        assert_eq!(op.shown.iter().filter(|s| *s == "Invalid selection").count(), 4);
        assert_eq!(r.preferred_index(), Some(1));
        assert!(op.shown.iter().any(|s| s.contains("Selected result: B")));
    }

    #[test]
    fn test_all_candidates_rendered_before_prompt() {
        let candidates = vec![titled("A"), titled("B")];
        let mut op = ScriptedOperator::new(&["1"]);
        CandidateSelector::select(&candidates, &mut op).unwrap();
        assert!(op.shown.iter().any(|s| s.contains("Result 01")));
        assert!(op.shown.iter().any(|s| s.contains("Result 02")));
        assert!(op.shown.iter().any(|s| s.contains("title: B")));
    }
}
