//! Script-facing capability modules of the reference editor

use rhai::{Array, Dynamic, EvalAltResult, ImmutableString, Map, Module, INT};

use super::editor::{Editor, LogLevel, Primitive, SceneObject};
use super::Host;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Accept both integer and float script values
fn number(value: &Dynamic) -> RhaiResult<f64> {
    if let Ok(i) = value.as_int() {
        return Ok(i as f64);
    }
    if let Ok(f) = value.as_float() {
        return Ok(f);
    }
    Err(format!("Expected a number, got {}", value.type_name()).into())
}

fn position(x: &Dynamic, y: &Dynamic, z: &Dynamic) -> RhaiResult<[f64; 3]> {
    Ok([number(x)?, number(y)?, number(z)?])
}

fn object_map(object: &SceneObject) -> Dynamic {
    let mut map = Map::new();
    map.insert("id".into(), Dynamic::from_int(object.id as INT));
    map.insert("name".into(), object.name.clone().into());
    map.insert("kind".into(), object.kind.as_str().into());
    map.insert("x".into(), Dynamic::from_float(object.position[0]));
    map.insert("y".into(), Dynamic::from_float(object.position[1]));
    map.insert("z".into(), Dynamic::from_float(object.position[2]));
    map.insert("active".into(), Dynamic::from_bool(object.active));
    Dynamic::from_map(map)
}

pub(super) fn scene(editor: &Editor) -> Module {
    let mut module = Module::new();

    let e = editor.clone();
    module.set_native_fn("name", move || -> RhaiResult<String> { Ok(e.scene_name()) });

    let e = editor.clone();
    module.set_native_fn(
        "create",
        move |name: ImmutableString,
              kind: ImmutableString,
              x: Dynamic,
              y: Dynamic,
              z: Dynamic|
              -> RhaiResult<Dynamic> {
            // unknown kinds fall back to an empty object
            let kind = kind.parse().unwrap_or(Primitive::Empty);
            let object = e.create_object(&name, kind, position(&x, &y, &z)?);
            Ok(object_map(&object))
        },
    );

    let e = editor.clone();
    module.set_native_fn("objects", move || -> RhaiResult<Array> {
        Ok(e.objects().iter().map(object_map).collect())
    });

    let e = editor.clone();
    module.set_native_fn("find", move |name: ImmutableString| -> RhaiResult<Dynamic> {
        Ok(e.find(&name).map(|o| object_map(&o)).unwrap_or(Dynamic::UNIT))
    });

    let e = editor.clone();
    module.set_native_fn("destroy", move |name: ImmutableString| -> RhaiResult<bool> {
        Ok(e.destroy(&name))
    });

    let e = editor.clone();
    module.set_native_fn(
        "set_position",
        move |name: ImmutableString, x: Dynamic, y: Dynamic, z: Dynamic| -> RhaiResult<bool> {
            Ok(e.set_position(&name, position(&x, &y, &z)?))
        },
    );

    let e = editor.clone();
    module.set_native_fn(
        "set_active",
        move |name: ImmutableString, active: bool| -> RhaiResult<bool> {
            Ok(e.set_active(&name, active))
        },
    );

    let e = editor.clone();
    module.set_native_fn("count", move || -> RhaiResult<INT> {
        Ok(e.objects().len() as INT)
    });

    module
}

pub(super) fn editor(editor: &Editor) -> Module {
    let mut module = Module::new();

    let e = editor.clone();
    module.set_native_fn("project_name", move || -> RhaiResult<String> {
        Ok(e.project().project_name)
    });

    let e = editor.clone();
    module.set_native_fn("scenes", move || -> RhaiResult<Array> {
        Ok(e.project().scenes.into_iter().map(Dynamic::from).collect())
    });

    let e = editor.clone();
    module.set_native_fn("is_playing", move || -> RhaiResult<bool> {
        Ok(e.status().playing)
    });

    let e = editor.clone();
    module.set_native_fn("is_paused", move || -> RhaiResult<bool> {
        Ok(e.status().paused)
    });

    let e = editor.clone();
    module.set_native_fn("enter_play_mode", move || -> RhaiResult<()> {
        e.set_playing(true);
        Ok(())
    });

    let e = editor.clone();
    module.set_native_fn("exit_play_mode", move || -> RhaiResult<()> {
        e.set_playing(false);
        Ok(())
    });

    let e = editor.clone();
    module.set_native_fn("set_paused", move |paused: bool| -> RhaiResult<()> {
        e.set_paused(paused);
        Ok(())
    });

    module
}

pub(super) fn console(editor: &Editor) -> Module {
    let mut module = Module::new();

    for (name, level) in [
        ("log", LogLevel::Info),
        ("warn", LogLevel::Warning),
        ("error", LogLevel::Error),
    ] {
        let e = editor.clone();
        module.set_native_fn(name, move |message: Dynamic| -> RhaiResult<()> {
            e.log(level, message.to_string());
            Ok(())
        });
    }

    let e = editor.clone();
    module.set_native_fn("tail", move |count: Dynamic| -> RhaiResult<String> {
        let count = number(&count)?.max(0.0) as usize;
        let entries = e.tail(count);
        if entries.is_empty() {
            return Ok("No log entries".to_string());
        }
        Ok(entries
            .iter()
            .map(|entry| entry.to_string())
            .collect::<Vec<_>>()
            .join("\n"))
    });

    let e = editor.clone();
    module.set_native_fn("clear", move || -> RhaiResult<()> {
        e.clear_console();
        Ok(())
    });

    module
}

pub(super) fn fs() -> Module {
    let mut module = Module::new();

    module.set_native_fn("read_text", |path: ImmutableString| -> RhaiResult<String> {
        std::fs::read_to_string(path.as_str())
            .map_err(|e| format!("Failed to read {}: {}", path, e).into())
    });

    module.set_native_fn(
        "write_text",
        |path: ImmutableString, text: ImmutableString| -> RhaiResult<()> {
            std::fs::write(path.as_str(), text.as_str())
                .map_err(|e| format!("Failed to write {}: {}", path, e).into())
        },
    );

    module.set_native_fn("exists", |path: ImmutableString| -> RhaiResult<bool> {
        Ok(std::path::Path::new(path.as_str()).exists())
    });

    module.set_native_fn("list_dir", |path: ImmutableString| -> RhaiResult<Array> {
        let entries = std::fs::read_dir(path.as_str())
            .map_err(|e| format!("Failed to list {}: {}", path, e))?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names.into_iter().map(Dynamic::from).collect())
    });

    module
}

pub(super) fn process() -> Module {
    let mut module = Module::new();

    module.set_native_fn(
        "run",
        |program: ImmutableString, args: Array| -> RhaiResult<Map> {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            let output = std::process::Command::new(program.as_str())
                .args(&args)
                .output()
                .map_err(|e| format!("Failed to run {}: {}", program, e))?;

            let mut result = Map::new();
            result.insert(
                "status".into(),
                Dynamic::from_int(output.status.code().unwrap_or(-1) as INT),
            );
            result.insert(
                "stdout".into(),
                String::from_utf8_lossy(&output.stdout).into_owned().into(),
            );
            result.insert(
                "stderr".into(),
                String::from_utf8_lossy(&output.stderr).into_owned().into(),
            );
            Ok(result)
        },
    );

    module
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_accepts_int_and_float() {
        assert_eq!(number(&Dynamic::from_int(3)).unwrap(), 3.0);
        assert_eq!(number(&Dynamic::from_float(2.5)).unwrap(), 2.5);
        assert!(number(&Dynamic::from("x".to_string())).is_err());
    }

    #[test]
    fn test_object_map_fields() {
        let object = SceneObject {
            id: 7,
            name: "Box".into(),
            kind: Primitive::Cube,
            position: [1.0, 2.0, 3.0],
            active: true,
        };
        let map = object_map(&object).cast::<Map>();
        assert_eq!(map["name"].clone().into_string().unwrap(), "Box");
        assert_eq!(map["kind"].clone().into_string().unwrap(), "Cube");
        assert_eq!(map["y"].as_float().unwrap(), 2.0);
        assert!(map["active"].as_bool().unwrap());
    }
}
