//! Console and file I/O: print, println, fopen, fclose, fread_all
//!
//! `print`/`println` take an explicit file first; the VM's hook inserts the
//! implicit STDOUT handle when source code omits it. `fopen` paths are
//! anchored to the calling module's directory by the same mechanism.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::value::{FileHandle, Value};

fn want_file<'a>(
    op: &'static str,
    value: &'a Value,
) -> Result<&'a Rc<RefCell<FileHandle>>, RuntimeError> {
    match value {
        Value::File(handle) => Ok(handle),
        other => Err(RuntimeError::type_mismatch(op, "file", other)),
    }
}

fn write_values(
    op: &'static str,
    handle: &Rc<RefCell<FileHandle>>,
    values: &[Value],
    newline: bool,
) -> Result<Value, RuntimeError> {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&value.to_display_string());
    }
    if newline {
        out.push('\n');
    }
    handle
        .borrow_mut()
        .write_str(&out)
        .map_err(|e| RuntimeError::general(op, e.to_string()))?;
    Ok(Value::Null)
}

/// Write values to a file, separated by spaces, no newline.
///
/// ```lisp
/// (print "a" 1) ; writes to stdout
/// (print f "a") ; writes to an opened file
/// ```
pub fn builtin_print(args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = want_file("print", &args[0])?;
    write_values("print", handle, &args[1..], false)
}

/// Like `print`, with a trailing newline.
pub fn builtin_println(args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = want_file("println", &args[0])?;
    write_values("println", handle, &args[1..], true)
}

/// Open a file for reading.
pub fn builtin_fopen(args: &[Value]) -> Result<Value, RuntimeError> {
    let path = match &args[0] {
        Value::Str(s) => PathBuf::from(s.as_ref()),
        other => return Err(RuntimeError::type_mismatch("fopen", "string", other)),
    };
    let file = std::fs::File::open(&path).map_err(|e| {
        RuntimeError::general("fopen", format!("{}: {}", path.display(), e))
    })?;
    Ok(Value::File(Rc::new(RefCell::new(FileHandle::disk(
        file, path,
    )))))
}

/// Close a file. Closing twice is fine; standard streams stay open.
pub fn builtin_fclose(args: &[Value]) -> Result<Value, RuntimeError> {
    want_file("fclose", &args[0])?.borrow_mut().close();
    Ok(Value::Null)
}

/// Read the rest of a file as one string.
pub fn builtin_fread_all(args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = want_file("fread_all", &args[0])?;
    let contents = handle
        .borrow_mut()
        .read_all()
        .map_err(|e| RuntimeError::general("fread_all", e.to_string()))?;
    Ok(Value::string(contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file_with(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_fopen_fread_fclose_cycle() {
        let (_dir, path) = temp_file_with("hello file");
        let file = builtin_fopen(&[Value::string(path.to_string_lossy().into_owned())]).unwrap();
        assert!(file.is_file());
        assert_eq!(
            builtin_fread_all(&[file.clone()]).unwrap(),
            Value::string("hello file")
        );
        builtin_fclose(&[file.clone()]).unwrap();
        // Second close is silent; reads after close fail.
        builtin_fclose(&[file.clone()]).unwrap();
        assert!(builtin_fread_all(&[file]).is_err());
    }

    #[test]
    fn test_fopen_missing_file() {
        assert!(builtin_fopen(&[Value::string("/no/such/file")]).is_err());
    }

    #[test]
    fn test_print_requires_file_first() {
        assert!(builtin_print(&[Value::string("not a file")]).is_err());
    }

    #[test]
    fn test_println_to_stdout_handle() {
        let out = Value::File(Rc::new(RefCell::new(FileHandle::Stdout)));
        assert_eq!(
            builtin_println(&[out, Value::Int(1), Value::string("x")]).unwrap(),
            Value::Null
        );
    }
}
