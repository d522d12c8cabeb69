//! Script sources shipped with the demonstration world.

use grue_vm::{ExecOrder, ScriptSource};

pub(crate) const CITYGUARD: &str = r#"
on_spawn() {
    this.patience = 2;
}

on_tick() {
    this.patience--;
    if (this.patience <= 0) {
        this.say("Move along, citizen.");
        this.patience = 2;
    }
}
"#;

pub(crate) const FIDO: &str = r#"
on_tick() {
    var others = mobs_in(this.room.vnum).count - 1;
    this.hp -= 4;
    if (this.hp > 0) this.say("Woof! ${others} others here. (${this.hp} hp)");
}
"#;

const HELPERS: &str = r#"
fun announce(text) {
    print "[world] " + text;
}
"#;

const CENSUS: &str = r#"
announce("${census()} mobs roam ${areas().count} area(s): ${areas()}");
"#;

/// The stored scripts, as a persistence layer would hand them back.
pub(crate) fn stored_scripts() -> Vec<ScriptSource> {
    vec![
        ScriptSource::new("midgaard", "census.grue", ExecOrder::Post, CENSUS),
        ScriptSource::new("lib", "helpers.grue", ExecOrder::Pre, HELPERS),
    ]
}
