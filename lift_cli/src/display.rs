//! Output formatting shared by the menu and the one-shot commands.

use chrono::{DateTime, Local, Utc};
use lift_core::{
    AddedSets, EndedSession, ExerciseStats, SessionId, SessionSummary, SetRecord, StartedSession,
};

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn started(started: &StartedSession) {
    if started.closed > 0 {
        println!("{} open session(s) closed.", started.closed);
    }
    println!("New session started. Session id: {}", started.session_id);
}

pub fn added(added: &AddedSets) {
    println!("{} sets added for '{}'.", added.count, added.exercise);
}

pub fn session_sets(session_id: SessionId, sets: &[SetRecord], unit: &str) {
    println!("Active session: {}", session_id);
    if sets.is_empty() {
        println!("  No sets logged yet.");
        return;
    }
    for set in sets {
        let marker = if set.is_one_rm { " *TESTED 1RM*" } else { "" };
        println!(
            "  #{} {}: {} {} x {} reps{}",
            set.set_index, set.exercise, set.weight, unit, set.reps, marker
        );
    }
}

pub fn stats(stats: &ExerciseStats, unit: &str) {
    println!("{} stats:", stats.exercise);
    println!("--> {} sets completed", stats.count);
    println!(
        "--> {} {} max weight at {} reps",
        stats.max_weight, unit, stats.reps_at_max
    );
    match stats.tested_one_rm {
        Some(weight) => println!("--> Tested 1RM at {} {}", weight, unit),
        None => println!("--> No tested 1RM"),
    }
}

pub fn sessions(sessions: &[SessionSummary]) {
    if sessions.is_empty() {
        println!("No sessions found.");
        return;
    }
    println!("{} sessions logged.", sessions.len());
    for summary in sessions {
        let session = &summary.session;
        let status = match session.ended_at {
            Some(ended_at) => format!("ended {}", local_time(ended_at)),
            None => "active".to_string(),
        };
        let notes = session
            .notes
            .as_deref()
            .map(|n| format!(" - {}", n))
            .unwrap_or_default();
        println!(
            "session {} [{}] {}, {} sets{}",
            session.id,
            local_time(session.started_at),
            status,
            summary.set_count,
            notes
        );
    }
}

pub fn ended(ended: Option<&EndedSession>) {
    match ended {
        Some(ended) => println!(
            "Ended session {} at {}.",
            ended.session_id,
            local_time(ended.ended_at)
        ),
        None => println!("No active session."),
    }
}
