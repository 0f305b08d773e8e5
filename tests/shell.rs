use turtleshell::{
    Config, Interpreter, ShellError, Value, concatenate_incomplete_lines, is_complete,
};

fn shell() -> Interpreter {
    Interpreter::new(&Config::default_config().unwrap()).unwrap()
}

/// Runs `line`, returning what it printed to stdout and stderr.
fn run(sh: &mut Interpreter, line: &str) -> Result<(String, String), ShellError> {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    sh.run_line(line, &mut out, &mut err)?;
    Ok((
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    ))
}

fn stdout(sh: &mut Interpreter, line: &str) -> String {
    run(sh, line).unwrap().0
}

#[test]
fn variable_round_trip() {
    let mut sh = shell();
    assert_eq!(stdout(&mut sh, "x = 10"), "");
    assert_eq!(stdout(&mut sh, "$x"), "10\n");
    assert_eq!(stdout(&mut sh, "x = \"ten\"; $x"), "ten\n");
}

#[test]
fn read_only_variables_reject_assignment() {
    let mut sh = shell();
    let before = sh.env().get("HOST");
    let err = run(&mut sh, "HOST = \"elsewhere\"").unwrap_err();
    assert!(matches!(err, ShellError::InvalidAssignment(_)));
    assert_eq!(sh.env().get("HOST"), before);
}

#[test]
fn prompt_aliases_write_through() {
    let mut sh = shell();
    if cfg!(windows) {
        return;
    }
    stdout(&mut sh, "PS1 = \"$ \"");
    assert_eq!(sh.env().get("PROMPT1"), Value::from("$ "));
    assert_eq!(sh.prompt("PROMPT1"), "$ ");
    stdout(&mut sh, "unset PS1");
    assert_eq!(sh.env().get("PROMPT1"), Value::from("$USER@$HOST: $CWD $ "));
}

#[test]
fn if_else_picks_one_branch() {
    let mut sh = shell();
    let out = stdout(&mut sh, "v = 2; if ($v == 2) { print \"two\" } else { print \"other\" }");
    assert_eq!(out, "two\n");
    let out = stdout(&mut sh, "if ($v == 3) { print \"three\" } else { print \"other\" }");
    assert_eq!(out, "other\n");
}

#[test]
fn unknown_command_is_reported_and_session_survives() {
    let mut sh = shell();
    let err = run(&mut sh, "frobnicate123").unwrap_err();
    assert_eq!(err.to_string(), "frobnicate123: command not found");
    assert_eq!(stdout(&mut sh, "print \"still here\""), "still here\n");
}

#[test]
fn unset_removes_variables() {
    let mut sh = shell();
    stdout(&mut sh, "a = 1; b = 2; unset a b");
    assert_eq!(sh.env().get("a"), Value::from(""));
    assert_eq!(sh.env().get("b"), Value::from(""));
    assert!(run(&mut sh, "unset OS").is_err());
}

#[test]
fn builtin_arguments_are_validated() {
    let mut sh = shell();
    let err = run(&mut sh, "print \"a\" --bogus").unwrap_err();
    assert!(matches!(err, ShellError::Argument { .. }), "got {err:?}");
}

#[cfg(unix)]
mod path_lookup {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn fake_bin(tag: &str, scripts: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("turtle_shell_tests_{}_{tag}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for (name, body) in scripts {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    }

    #[test]
    fn builtins_shadow_executables() {
        let dir = fake_bin("shadow", &[("print", "echo external")]);
        let mut sh = shell();
        sh.env_mut().set("PATH", dir.display().to_string()).unwrap();
        assert_eq!(stdout(&mut sh, "print \"builtin\""), "builtin\n");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn executables_are_found_on_path() {
        let dir = fake_bin("greet", &[("turtle_greet", "echo \"greet $1 $GREETING\"; echo warn >&2")]);
        let mut sh = shell();
        sh.env_mut().set("PATH", dir.display().to_string()).unwrap();
        let (out, err) = run(&mut sh, "GREETING = \"hello\"; turtle_greet 7").unwrap();
        assert_eq!(out, "greet 7 hello\n");
        assert_eq!(err, "warn\n");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn empty_path_finds_nothing() {
        let mut sh = shell();
        sh.env_mut().set("PATH", "").unwrap();
        let err = run(&mut sh, "sh").unwrap_err();
        assert!(matches!(err, ShellError::CommandNotFound(name) if name == "sh"));
    }
}

#[test]
fn completeness_drives_continuation() {
    let lines = ["if ($x == 1) {", "print \"one\"", "} else {", "print \"many\" }"];
    let mut pending: Vec<&str> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        pending.push(line);
        assert_eq!(is_complete(&pending.join(" ")), i == lines.len() - 1, "after line {i}");
    }
    let joined = concatenate_incomplete_lines(&pending);
    assert_eq!(joined, "if ($x == 1) { print \"one\" } else { print \"many\" }");
    assert_eq!(concatenate_incomplete_lines(&[joined.as_str()]), joined);

    let mut sh = shell();
    assert_eq!(stdout(&mut sh, &joined), "many\n");
}
