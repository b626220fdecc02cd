use std::process::Command;

use assert_cmd::prelude::*;
use tempfile::{tempdir, TempDir};

// Drives the compiled binary against a throwaway workout and config file

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
        }
    }

    fn workout(&self) -> std::path::PathBuf {
        self.dir.path().join("workout.json")
    }

    fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("liftlog").unwrap();
        cmd.arg("--file")
            .arg(self.workout())
            .arg("--config")
            .arg(self.dir.path().join("config.json"))
            .args(args);
        cmd
    }

    fn run(&self, args: &[&str]) -> String {
        let out = self.cmd(args).output().unwrap();
        assert!(
            out.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).unwrap()
    }
}

#[test]
fn build_and_show_workout() {
    let env = Env::new();
    env.run(&["new", "Leg Day"]);
    assert!(env.workout().exists());

    let squat = env.run(&["add-exercise", "Back Squat", "-c", "Legs"]);
    assert!(!squat.trim().is_empty());
    env.run(&["add-set", "1", "-w", "100", "-r", "5"]);
    env.run(&["add-set", "back squat", "-w", "90", "-r", "6", "--rest", "0"]);

    let show = env.run(&["show"]);
    assert!(show.starts_with("Leg Day"));
    assert!(show.contains("Back Squat"));
    assert!(show.contains("100kg x 5"));
    assert!(show.contains("rest 1:30"));
    assert!(show.contains("90kg x 6"));
}

#[test]
fn show_without_workout_fails() {
    let env = Env::new();
    let out = env.cmd(&["show"]).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no workout"));
}

#[test]
fn dropset_and_complete() {
    let env = Env::new();
    env.run(&["new"]);
    env.run(&["add-exercise", "Curl"]);
    for _ in 0..4 {
        env.run(&["add-set", "1", "-w", "20", "-r", "10"]);
    }
    assert_eq!(env.run(&["dropset", "1", "2", "3", "--kind", "failure"]).trim(), "updated");
    let show = env.run(&["show"]);
    assert_eq!(show.matches("drop:").count(), 2);
    assert_eq!(show.matches("failure").count(), 2);

    // a single set is not a dropset
    assert_eq!(env.run(&["dropset", "1", "4"]).trim(), "unchanged");

    let out = env.run(&["complete", "1", "1"]);
    assert!(out.contains("completed"));
    assert!(out.contains("rest 1:30"));
    assert!(env.run(&["show"]).contains("[x]"));
}

#[test]
fn group_move_and_ungroup() {
    let env = Env::new();
    env.run(&["new"]);
    env.run(&["add-exercise", "Bench"]);
    env.run(&["add-exercise", "Row"]);
    env.run(&["add-exercise", "Dip"]);

    assert_eq!(env.run(&["group", "bench", "row", "--kind", "hiit"]).trim(), "updated");
    let flat = env.run(&["flat"]);
    assert_eq!(flat.lines().count(), 5);
    assert!(flat.lines().next().unwrap().contains("[HIIT"));

    // pull Dip (row 5) into the group, between Bench and Row
    assert_eq!(env.run(&["move", "5", "3"]).trim(), "updated");
    let flat = env.run(&["flat"]);
    let names: Vec<_> = flat
        .lines()
        .map(|l| l.split_whitespace().nth(1).unwrap().to_string())
        .collect();
    assert_eq!(names, ["[HIIT", "Bench", "Dip", "Row", "]"]);

    let out = env.cmd(&["move", "9", "1"]).output().unwrap();
    assert!(!out.status.success());

    let group_id = flat.lines().next().unwrap().split_whitespace().last().unwrap();
    let group_id = group_id.trim_start_matches("header:");
    assert_eq!(env.run(&["ungroup", group_id]).trim(), "updated");
    assert_eq!(env.run(&["flat"]).lines().count(), 3);
}

#[test]
fn unknown_group_is_reported_as_group() {
    let env = Env::new();
    env.run(&["new"]);
    env.run(&["add-exercise", "Bench"]);
    env.run(&["add-exercise", "Row"]);

    for args in [
        &["add-exercise", "Dip", "-g", "g-missing"][..],
        &["group", "bench", "row", "--edit", "g-missing"][..],
    ] {
        let out = env.cmd(args).output().unwrap();
        assert!(!out.status.success());
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("no group matches \"g-missing\""), "{stderr}");
        assert!(!stderr.contains("no exercise"));
    }
}

#[test]
fn config_round_trip() {
    let env = Env::new();
    let out = env.run(&["config"]);
    assert!(out.contains("default_rest_seconds  90"));
    let out = env.run(&["config", "--default-rest", "120", "--unit", "lbs"]);
    assert!(out.contains("default_rest_seconds  120"));
    assert!(out.contains("weight_unit           lbs"));

    env.run(&["new"]);
    env.run(&["add-exercise", "Press"]);
    env.run(&["add-set", "1", "-w", "95", "-r", "8"]);
    let show = env.run(&["show"]);
    assert!(show.contains("95lbs x 8"));
    assert!(show.contains("rest 2:00"));
}

#[test]
fn rest_countdown_without_tty_marks_rest_taken() {
    let env = Env::new();
    env.run(&["config", "--tick-ms", "50"]);
    env.run(&["new"]);
    env.run(&["add-exercise", "Row"]);
    env.run(&["add-set", "1", "-w", "60", "-r", "10"]);

    env.run(&["rest", "1", "1", "--seconds", "1"]);
    assert!(env.run(&["show"]).contains("rest 1:30 done"));
}
