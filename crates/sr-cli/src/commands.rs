use std::fs;

use sr_core::exchange::{ensure_json_file_name, export_file_name};
use sr_core::{
    Background, Decision, EditorError, FileStore, ImportPolicy, InterceptorState, MatchType, Message, Messenger,
    NavigationRequest, RequestType, Rule, RuleDraft, RuleEditor, RuleStore, SiteStatus, StatusPanel,
};

use crate::prompt::Prompt;

/// One CLI invocation: a background started over the store file, plus
/// editing handles that notify it.
struct Session {
    store: FileStore,
    background: Background<FileStore>,
    needs_onboarding: bool,
}

impl Session {
    fn open(path: &str) -> Self {
        let store = FileStore::new(path);
        let mut background = Background::new(store.clone());
        let needs_onboarding = background.start();
        Self {
            store,
            background,
            needs_onboarding,
        }
    }

    fn editor(&self) -> Result<RuleEditor<FileStore, Messenger>, String> {
        RuleEditor::open(self.store.clone(), self.background.messenger())
            .map_err(|e| format!("Failed to read '{}': {}", self.store.path().display(), e))
    }

    fn panel(&self, url: Option<String>) -> StatusPanel<FileStore, Messenger> {
        StatusPanel::open(self.store.clone(), self.background.messenger(), url)
    }

    /// Let the background process queued messages and store changes.
    fn settle(&mut self) {
        let handled = self.background.pump();
        log::debug!(
            "Background handled {} event(s), {} rule(s) cached, {:?}",
            handled,
            self.background.interceptor().rules().len(),
            self.background.state()
        );
    }
}

fn print_rule(position: usize, rule: &Rule) {
    println!(
        "  {:>3}. [{}] {} -> {} ({})",
        position,
        if rule.enabled { "on " } else { "off" },
        rule.source,
        rule.destination,
        rule.match_type
    );
    println!("       id: {}  created: {}", rule.id, rule.created);
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

pub fn cmd_list(store: &str) -> Result<(), String> {
    let session = Session::open(store);
    let snapshot = session
        .store
        .load()
        .map_err(|e| format!("Failed to read '{}': {}", store, e))?;

    println!("Redirecting is {}", on_off(snapshot.enabled));
    if snapshot.rules.is_empty() {
        println!("No redirect rules yet.");
        if session.needs_onboarding {
            println!("Add one with: sr-cli add <SOURCE> <DESTINATION>");
        }
        return Ok(());
    }

    for (index, rule) in snapshot.rules.iter().enumerate() {
        print_rule(index + 1, rule);
    }
    Ok(())
}

pub fn cmd_add(store: &str, source: &str, destination: &str, match_type: &str) -> Result<(), String> {
    let mut session = Session::open(store);
    let mut editor = session.editor()?;

    let draft = RuleDraft::new(source, destination, MatchType::from_name(match_type));
    let rule = editor.create(&draft).map_err(|e| e.to_string())?;
    session.settle();

    println!("Redirect rule added successfully!");
    print_rule(editor.rules().len(), &rule);
    Ok(())
}

pub fn cmd_edit(
    store: &str,
    id: &str,
    source: Option<String>,
    destination: Option<String>,
    match_type: Option<&str>,
) -> Result<(), String> {
    let mut session = Session::open(store);
    let mut editor = session.editor()?;

    let mut draft = editor.begin_edit(id).map_err(|e| e.to_string())?;
    if let Some(source) = source {
        draft.source = source;
    }
    if let Some(destination) = destination {
        draft.destination = destination;
    }
    if let Some(name) = match_type {
        draft.match_type = MatchType::from_name(name);
    }

    let rule = editor.create(&draft).map_err(|e| e.to_string())?;
    session.settle();

    println!("Rule updated (new id {})", rule.id);
    print_rule(editor.rules().len(), &rule);
    Ok(())
}

pub fn cmd_delete(store: &str, id: &str, yes: bool) -> Result<(), String> {
    let mut session = Session::open(store);
    let mut editor = session.editor()?;

    match editor.delete(id, &mut Prompt::new(yes)) {
        Ok(rule) => {
            session.settle();
            println!("Deleted rule for {}", rule.source);
            Ok(())
        }
        Err(EditorError::Declined) => {
            println!("Cancelled.");
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

pub fn cmd_toggle(store: &str, id: &str) -> Result<(), String> {
    let mut session = Session::open(store);
    let mut editor = session.editor()?;

    let enabled = editor.toggle(id).map_err(|e| e.to_string())?;
    session.settle();

    println!("Rule {} is now {}", id, if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub fn cmd_set_enabled(store: &str, enabled: bool) -> Result<(), String> {
    let mut session = Session::open(store);
    let mut panel = session.panel(None);

    if panel.is_enabled() != enabled {
        panel.toggle_extension().map_err(|e| e.to_string())?;
        session.settle();
    }

    println!("Redirecting is {}", on_off(enabled));
    Ok(())
}

pub fn cmd_export(store: &str, output: Option<&str>) -> Result<(), String> {
    let session = Session::open(store);
    let editor = session.editor()?;

    let document = editor.export().map_err(|e| e.to_string())?;
    let content = document
        .to_json()
        .map_err(|e| format!("Failed to serialize rules: {}", e))?;

    let path = match output {
        Some("-") => {
            println!("{}", content);
            return Ok(());
        }
        Some(path) => path.to_string(),
        None => export_file_name(),
    };
    fs::write(&path, content).map_err(|e| format!("Failed to write '{}': {}", path, e))?;

    println!("Exported {} rules to '{}'", document.rules.len(), path);
    Ok(())
}

pub fn cmd_import(store: &str, input: &str, replace: bool, merge: bool) -> Result<(), String> {
    ensure_json_file_name(input).map_err(|e| e.to_string())?;
    let text = fs::read_to_string(input).map_err(|e| format!("Failed to read '{}': {}", input, e))?;

    let mut session = Session::open(store);
    let mut editor = session.editor()?;

    let result = if replace {
        editor.import_with_policy(&text, ImportPolicy::Replace)
    } else if merge {
        editor.import_with_policy(&text, ImportPolicy::Merge)
    } else {
        editor.import(&text, &mut Prompt::new(false))
    };
    let count = result.map_err(|e| e.to_string())?;
    session.settle();

    println!("Successfully imported {} rules!", count);
    println!("  Total rules: {}", editor.rules().len());
    Ok(())
}

pub fn cmd_clear(store: &str, yes: bool) -> Result<(), String> {
    let mut session = Session::open(store);
    let mut editor = session.editor()?;

    match editor.clear_all(&mut Prompt::new(yes)) {
        Ok(count) => {
            session.settle();
            println!("Cleared {} rules", count);
            Ok(())
        }
        Err(EditorError::Declined) => {
            println!("Cancelled.");
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

pub fn cmd_check(store: &str, url: &str, request_type: &str) -> Result<(), String> {
    let session = Session::open(store);
    let request = NavigationRequest {
        url,
        request_type: RequestType::from_str(request_type),
    };

    match session.background.evaluate(&request) {
        Decision::Redirect { url: target, rule_id } => {
            println!("{} -> {} (rule {})", url, target, rule_id);
        }
        Decision::Allow => {
            let reason = if !request.request_type.is_top_level() {
                "not a top-level navigation"
            } else if session.background.state() == InterceptorState::Disabled {
                "redirecting is off"
            } else {
                "no matching rule"
            };
            println!("{} loads normally ({})", url, reason);
        }
    }
    Ok(())
}

pub fn cmd_status(store: &str, url: Option<String>) -> Result<(), String> {
    let session = Session::open(store);
    let summary = session.panel(url).summary();

    println!("Active rules: {}", summary.active_rules);
    println!("Status:       {}", if summary.enabled { "Enabled" } else { "Disabled" });
    match summary.site {
        SiteStatus::Unknown => println!("Current site: unknown"),
        SiteStatus::InvalidUrl => println!("Current site: invalid URL"),
        SiteStatus::Redirects { host, destination } => {
            println!("Current site: {} (redirects to {})", host, destination)
        }
        SiteStatus::NoRule { host } => println!("Current site: {} (no rule)", host),
    }
    Ok(())
}

pub fn cmd_quick_add(store: &str, url: &str, destination: &str) -> Result<(), String> {
    let mut session = Session::open(store);
    let mut panel = session.panel(Some(url.to_string()));

    let rule = panel.quick_add(destination).map_err(|e| e.to_string())?;
    session.settle();

    println!("Rule added for {}", rule.source);
    Ok(())
}

pub fn cmd_message(store: &str, json: &str) -> Result<(), String> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| format!("Invalid message: {}", e))?;
    let mut session = Session::open(store);

    match session.background.handle_message(Message::from_json(&value)) {
        Some(response) => {
            let text = serde_json::to_string_pretty(&response)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            println!("{}", text);
        }
        None => println!("No response (unknown action)"),
    }
    Ok(())
}
