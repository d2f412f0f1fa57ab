//! Integration tests for note and directive parsing

mod common;

use common::{create_test_note, note};
use howzit::directive::{self, DirectiveKind, TaskType};
use howzit::notes::BuildNote;
use howzit::ui::LogLevel;

const RELEASE_NOTE: &str = r#"project: widget

# Widget

## Release (version:0.1.0)

@before
Make sure @run(rm -rf /) is never parsed from here.
@end

@log_level(debug)
@set_var(TAG, "v${version}")

@if file exists Cargo.toml
@run(cargo build --release) Build [%project]
@elsif file exists package.json
@run(npm run build) Build JS
@else
@copy(no build system found)
@end

```run Publish
#!/bin/sh
echo "publishing $TAG"
```

```bash
@run(echo not a task)
```

@include(Changelog [${version}])

@after
Announce the release.
@end

## Changelog

@open(https://example.com/changelog)
"#;

#[test]
fn test_parse_release_topic() {
    let note = note(RELEASE_NOTE);
    assert_eq!(note.title.as_deref(), Some("Widget"));
    assert_eq!(note.topic_titles(), vec!["Release", "Changelog"]);

    let release = &note.topics[0];
    assert_eq!(release.arguments[0].name, "version");
    assert_eq!(release.prereqs.len(), 1);
    assert_eq!(release.postreqs, vec!["Announce the release."]);

    let kinds: Vec<&str> = release
        .directives
        .iter()
        .map(|d| match &d.kind {
            DirectiveKind::If(_) => "if",
            DirectiveKind::Unless(_) => "unless",
            DirectiveKind::Elsif(_) => "elsif",
            DirectiveKind::Else => "else",
            DirectiveKind::End => "end",
            DirectiveKind::Task(_) => "task",
            DirectiveKind::LogLevel(_) => "log_level",
            DirectiveKind::SetVar { .. } => "set_var",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["log_level", "set_var", "if", "task", "elsif", "task", "else", "task", "end", "task", "task"]
    );
}

#[test]
fn test_conditional_paths() {
    let note = note(RELEASE_NOTE);
    let directives = &note.topics[0].directives;

    // if at 2, elsif at 4, else at 6
    assert_eq!(directives[3].conditional_path, vec![2]);
    assert_eq!(directives[4].conditional_path, Vec::<usize>::new());
    assert_eq!(directives[5].conditional_path, vec![4]);
    assert_eq!(directives[7].conditional_path, vec![6]);
    assert!(directives[9].conditional_path.is_empty());
}

#[test]
fn test_task_details() {
    let note = note(RELEASE_NOTE);
    let tasks: Vec<_> = note.topics[0].tasks().collect();

    assert_eq!(tasks[0].title, "Build widget");
    assert_eq!(tasks[2].task_type, TaskType::Copy);

    let block = tasks[3];
    assert_eq!(block.task_type, TaskType::Block);
    assert_eq!(block.title, "Publish");
    assert!(block.action.starts_with("#!/bin/sh\n"));

    let include = tasks[4];
    assert_eq!(include.task_type, TaskType::Include);
    assert_eq!(include.action, "Changelog");
    assert_eq!(include.arguments, vec!["${version}"]);
}

#[test]
fn test_log_level_and_set_var_directives() {
    let note = note(RELEASE_NOTE);
    let directives = &note.topics[0].directives;

    assert_eq!(directives[0].kind, DirectiveKind::LogLevel(LogLevel::Debug));
    assert_eq!(
        directives[1].kind,
        DirectiveKind::SetVar {
            name: "TAG".to_string(),
            value: "\"v${version}\"".to_string()
        }
    );
}

#[test]
fn test_parse_is_repeatable() {
    let body = &note(RELEASE_NOTE).topics[0].content;
    let first = directive::parse(body);
    let second = directive::parse(body);
    assert_eq!(first.directives, second.directives);
}

#[test]
fn test_load_note_from_disk() {
    let (_temp_dir, path) = create_test_note("## Build\n\n@run(make)\n");
    let note = BuildNote::load(&path).unwrap();

    assert_eq!(note.path.as_deref(), Some(path.as_path()));
    assert_eq!(note.topics[0].source_file.as_deref(), Some(path.as_path()));
}
