use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::io::Write;
use std::path::PathBuf;

const PROFILE_DATE_FORMAT: &str = "%d/%m/%Y";
const DEFAULT_PENSION_AGE: u32 = 67;
// Used for the projection when no date of birth is on file.
const DEFAULT_CURRENT_AGE: u32 = 60;

/// Answers the interactive questions of a run. The analysis itself never
/// touches a terminal; it asks through this trait, so tests and
/// non-interactive runs plug in their own sources.
pub trait PromptSource {
    /// Returns the user's reply, or `None` when no input is available.
    fn prompt(&mut self, message: &str) -> Result<Option<String>>;
}

/// Reads replies from stdin.
pub struct StdinPrompt;

impl PromptSource for StdinPrompt {
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        print!("{message}");
        io::stdout().flush()?;
        let mut reply = String::new();
        io::stdin().read_line(&mut reply)?;
        Ok(Some(reply.trim().to_string()))
    }
}

/// Never has input. Pending descriptions all become expenses and profile
/// questions are skipped; output is deterministic.
pub struct NoPrompt;

impl PromptSource for NoPrompt {
    fn prompt(&mut self, _: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
pub struct ScriptedPrompt {
    replies: std::collections::VecDeque<String>,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn new(replies: &[&str]) -> ScriptedPrompt {
        ScriptedPrompt {
            replies: replies.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[cfg(test)]
impl PromptSource for ScriptedPrompt {
    fn prompt(&mut self, _: &str) -> Result<Option<String>> {
        Ok(self.replies.pop_front())
    }
}

/// What the user has told us across runs: which recurring descriptions are
/// expenses vs. investments, plus the profile facts the projection needs.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationState {
    #[serde(default)]
    pub expenses: BTreeSet<String>,
    #[serde(default)]
    pub investments: BTreeSet<String>,
    /// dd/mm/yyyy, or empty when not yet provided.
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub pension_age: Option<u32>,
}

impl ClassificationState {
    pub fn is_known(&self, description: &str) -> bool {
        self.expenses.contains(description) || self.investments.contains(description)
    }

    pub fn is_investment(&self, description: &str) -> bool {
        self.investments.contains(description)
    }

    pub fn current_age(&self, today: NaiveDate) -> u32 {
        NaiveDate::parse_from_str(&self.date_of_birth, PROFILE_DATE_FORMAT)
            .map(|dob| (today.year() - dob.year()).max(0) as u32)
            .unwrap_or(DEFAULT_CURRENT_AGE)
    }

    pub fn pension_age_or_default(&self) -> u32 {
        self.pension_age.unwrap_or(DEFAULT_PENSION_AGE)
    }
}

/// One JSON file per institution/profile, written only when something
/// actually changed. Concurrent runs against the same file are not
/// supported; the process is short-lived and takes no lock.
pub struct ClassificationStore {
    path: PathBuf,
    pub state: ClassificationState,
    loaded: ClassificationState,
}

impl ClassificationStore {
    /// Opens the store for `store_id` under the platform config directory,
    /// with empty defaults when the file does not exist yet.
    pub fn open(store_id: &str) -> Result<ClassificationStore> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("could not determine the configuration directory"))?
            .join("firesight");
        ClassificationStore::open_at(dir.join(format!("{store_id}.json")))
    }

    pub fn open_at(path: PathBuf) -> Result<ClassificationStore> {
        let state = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("{} is not a valid classification file", path.display()))?
        } else {
            ClassificationState::default()
        };
        Ok(ClassificationStore {
            path,
            loaded: state.clone(),
            state,
        })
    }

    /// Writes the state back, but only if it differs from what was loaded.
    pub fn save(&mut self) -> Result<()> {
        if self.state == self.loaded {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.loaded = self.state.clone();
        Ok(())
    }

    /// Asks the user which of the unknown descriptions are investments.
    ///
    /// The pending list is shown with 1-based indexes; picking an index
    /// marks that description as an investment and redisplays the shrinking
    /// list. An empty reply, or no input at all, classifies everything still
    /// pending as an expense. Either way nothing here is ever asked again.
    pub fn resolve_unknown(
        &mut self,
        pending: BTreeSet<String>,
        prompts: &mut dyn PromptSource,
    ) -> Result<()> {
        let mut pending: Vec<String> = pending
            .into_iter()
            .filter(|d| !self.state.is_known(d))
            .collect();

        while !pending.is_empty() {
            let mut menu = String::new();
            for (i, description) in pending.iter().enumerate() {
                menu.push_str(&format!("{} {}\n", i + 1, description));
            }
            menu.push_str(
                "Choose one item that is an investment (and therefore not an expense), \
                 otherwise <enter>: ",
            );

            let reply = match prompts.prompt(&menu)? {
                Some(reply) => reply,
                None => break,
            };
            if reply.is_empty() {
                break;
            }
            match reply.parse::<usize>() {
                Ok(choice) if choice >= 1 && choice <= pending.len() => {
                    let description = pending.remove(choice - 1);
                    self.state.investments.insert(description);
                }
                _ => warn!("enter a menu item or <enter>, not '{reply}'"),
            }
        }

        // Whatever is left is an expense, permanently.
        self.state.expenses.extend(pending);
        Ok(())
    }

    /// Fills in missing profile facts, interactively and at most once per
    /// fact. Invalid input is logged and left unset, so the question comes
    /// back on the next run instead of poisoning the store.
    pub fn ensure_profile(&mut self, prompts: &mut dyn PromptSource) -> Result<()> {
        if self.state.date_of_birth.is_empty() {
            let reply = prompts.prompt(
                "Enter your date of birth so that we can make F.I.R.E. calculations \
                 (dd/mm/yyyy): ",
            )?;
            if let Some(reply) = reply {
                if NaiveDate::parse_from_str(&reply, PROFILE_DATE_FORMAT).is_ok() {
                    self.state.date_of_birth = reply;
                } else {
                    warn!("'{reply}' is not a valid dd/mm/yyyy date, you will be asked again");
                }
            }
        }

        if !self.state.date_of_birth.is_empty() && self.state.pension_age.is_none() {
            let reply =
                prompts.prompt("Enter your age when you will receive your pension (67): ")?;
            if let Some(reply) = reply {
                if reply.is_empty() {
                    self.state.pension_age = Some(DEFAULT_PENSION_AGE);
                } else {
                    match reply.parse::<u32>() {
                        Ok(age) => self.state.pension_age = Some(age),
                        Err(_) => {
                            warn!("'{reply}' is not a valid age, you will be asked again")
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod resolve_unknown_tests {
    use super::*;

    fn pending(descriptions: &[&str]) -> BTreeSet<String> {
        descriptions.iter().map(|d| d.to_string()).collect()
    }

    fn store() -> ClassificationStore {
        ClassificationStore {
            path: PathBuf::from("unused.json"),
            state: ClassificationState::default(),
            loaded: ClassificationState::default(),
        }
    }

    #[test]
    fn no_input_classifies_everything_as_expense() {
        let mut store = store();
        store
            .resolve_unknown(pending(&["Groceries", "Rent"]), &mut NoPrompt)
            .unwrap();
        assert!(store.state.expenses.contains("Groceries"));
        assert!(store.state.expenses.contains("Rent"));
        assert!(store.state.investments.is_empty());
    }

    #[test]
    fn picking_an_index_marks_an_investment() {
        let mut store = store();
        // BTreeSet iteration is sorted: 1 Groceries, 2 Savings Deposit.
        let mut prompts = ScriptedPrompt::new(&["2", ""]);
        store
            .resolve_unknown(pending(&["Groceries", "Savings Deposit"]), &mut prompts)
            .unwrap();
        assert!(store.state.investments.contains("Savings Deposit"));
        assert!(store.state.expenses.contains("Groceries"));
    }

    #[test]
    fn invalid_replies_redisplay_the_menu() {
        let mut store = store();
        let mut prompts = ScriptedPrompt::new(&["7", "x", "1", ""]);
        store
            .resolve_unknown(pending(&["Groceries", "Rent"]), &mut prompts)
            .unwrap();
        assert!(store.state.investments.contains("Groceries"));
        assert!(store.state.expenses.contains("Rent"));
    }

    #[test]
    fn known_descriptions_are_never_asked_again() {
        let mut store = store();
        store.state.expenses.insert("Groceries".to_string());
        store.state.investments.insert("Savings Deposit".to_string());
        // Exhausting the prompt would panic the scripted source below if it
        // were consulted; an empty script returning None proves it was not.
        let mut prompts = ScriptedPrompt::new(&[]);
        store
            .resolve_unknown(pending(&["Groceries", "Savings Deposit"]), &mut prompts)
            .unwrap();
        assert_eq!(store.state.expenses.len(), 1);
        assert_eq!(store.state.investments.len(), 1);
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let mut store = store();
        let mut prompts = ScriptedPrompt::new(&["1", ""]);
        store
            .resolve_unknown(pending(&["Groceries", "Rent"]), &mut prompts)
            .unwrap();
        let after_first = store.state.clone();
        let mut prompts = ScriptedPrompt::new(&["1", ""]);
        store
            .resolve_unknown(pending(&["Groceries", "Rent"]), &mut prompts)
            .unwrap();
        assert_eq!(store.state, after_first);
    }
}

#[cfg(test)]
mod profile_tests {
    use super::*;

    fn store() -> ClassificationStore {
        ClassificationStore {
            path: PathBuf::from("unused.json"),
            state: ClassificationState::default(),
            loaded: ClassificationState::default(),
        }
    }

    #[test]
    fn valid_date_of_birth_is_kept() {
        let mut store = store();
        let mut prompts = ScriptedPrompt::new(&["01/02/1980", ""]);
        store.ensure_profile(&mut prompts).unwrap();
        assert_eq!(store.state.date_of_birth, "01/02/1980");
        assert_eq!(store.state.pension_age, Some(67));
    }

    #[test]
    fn invalid_date_of_birth_is_left_unset() {
        let mut store = store();
        let mut prompts = ScriptedPrompt::new(&["1980-02-01"]);
        store.ensure_profile(&mut prompts).unwrap();
        assert_eq!(store.state.date_of_birth, "");
        // Pension age is only asked once the date of birth is known.
        assert_eq!(store.state.pension_age, None);
    }

    #[test]
    fn explicit_pension_age_is_kept() {
        let mut store = store();
        let mut prompts = ScriptedPrompt::new(&["01/02/1980", "70"]);
        store.ensure_profile(&mut prompts).unwrap();
        assert_eq!(store.state.pension_age, Some(70));
    }

    #[test]
    fn non_interactive_runs_skip_the_questions() {
        let mut store = store();
        store.ensure_profile(&mut NoPrompt).unwrap();
        assert_eq!(store.state.date_of_birth, "");
        assert_eq!(store.state.pension_age, None);
    }

    #[test]
    fn profile_facts_are_not_asked_twice() {
        let mut store = store();
        store.state.date_of_birth = "01/02/1980".to_string();
        store.state.pension_age = Some(67);
        let mut prompts = ScriptedPrompt::new(&[]);
        store.ensure_profile(&mut prompts).unwrap();
        assert_eq!(store.state.date_of_birth, "01/02/1980");
    }

    #[test]
    fn current_age_defaults_without_date_of_birth() {
        let today = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        assert_eq!(ClassificationState::default().current_age(today), 60);
        let state = ClassificationState {
            date_of_birth: "01/02/1980".to_string(),
            ..Default::default()
        };
        assert_eq!(state.current_age(today), 43);
    }
}
