use std::path::PathBuf;

use crate::api::models::UploadedFile;
use crate::config::Config;

/// Script names: [a-zA-Z0-9-_. ]+, at most this many characters.
pub const MAX_SCRIPT_NAME_LEN: usize = 128;

fn legal_script_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ')
}

/// Validate the requested script name and resolve it under the scripts
/// directory.
///
/// Cheap syntactic checks run first; the filesystem is only touched for the
/// final existence probe, so malformed input never causes disk I/O. Returns
/// the resolved path on success, the client-visible message on failure.
pub fn script_errors(script: Option<&str>, config: &Config) -> Result<PathBuf, String> {
    let Some(script) = script else {
        return Err("The script is missing.".to_string());
    };
    // Limits are in characters, not bytes, so multibyte names are measured
    // the same way the caller sees them.
    if script.chars().count() > MAX_SCRIPT_NAME_LEN {
        return Err("The name of the script is too long.".to_string());
    }
    let illegal = script.is_empty()
        || !script.chars().all(legal_script_char)
        || script.trim() != script
        || script.contains("..")
        || script.starts_with('-')
        || script.ends_with('-')
        || script.starts_with('.')
        || script.ends_with('.');
    if illegal {
        return Err("The script has illegal characters.".to_string());
    }
    // The character class already forbids separators, but the prefix check
    // stays as the invariant the rest of the pipeline relies on.
    let resolved = config.scripts_dir.join(script);
    if !resolved.starts_with(&config.scripts_dir) {
        return Err("The script is outside of the scripts folder.".to_string());
    }
    if !resolved.is_file() {
        return Err(format!("The script \"{script}\" does not exist."));
    }
    Ok(resolved)
}

/// Validate the argument list. An empty list is valid.
pub fn args_errors(args: &[String], config: &Config) -> Result<(), String> {
    if args.len() > config.max_args {
        return Err(format!("Too many args. The limit is {}.", config.max_args));
    }
    let longest = args.iter().map(|a| a.chars().count()).max().unwrap_or(0);
    if longest > config.max_arg_length {
        return Err(format!(
            "The longest arg exceeds the maximum length of {}.",
            config.max_arg_length
        ));
    }
    Ok(())
}

/// Validate the uploaded file set. An empty set is valid.
///
/// The count check short-circuits; the per-file checks (size, content,
/// extension) all run in a single pass so the message names every offender
/// at once instead of making the caller fix files one upload at a time.
pub fn file_errors(files: &[UploadedFile], config: &Config) -> Result<(), String> {
    if files.len() > config.max_files {
        return Err(format!("Too many files. The limit is {}.", config.max_files));
    }

    let mut too_large: Vec<&str> = Vec::new();
    let mut no_content: Vec<&str> = Vec::new();
    let mut bad_extension: Vec<&str> = Vec::new();

    for file in files {
        if file.size() > config.max_file_bytes {
            too_large.push(&file.name);
        }
        if file.data.is_empty() {
            no_content.push(&file.name);
        }
        if !extension_allowed(file, &config.allowed_extensions) {
            bad_extension.push(&file.name);
        }
    }

    if too_large.is_empty() && no_content.is_empty() && bad_extension.is_empty() {
        return Ok(());
    }

    let mut parts = Vec::new();
    if !too_large.is_empty() {
        parts.push(format!(
            "The following files were too large: {}. The limit is {} bytes.",
            too_large.join(", "),
            config.max_file_bytes
        ));
    }
    if !no_content.is_empty() {
        parts.push(format!(
            "The following files had no content: {}.",
            no_content.join(", ")
        ));
    }
    if !bad_extension.is_empty() {
        parts.push(format!(
            "The following files had invalid extensions: {}. Allowed extensions are: {}.",
            bad_extension.join(", "),
            config.allowed_extensions.join(", ")
        ));
    }
    Err(parts.join(" "))
}

/// Extension after the last dot, lower-cased. `None` when there is no dot,
/// nothing before it, or nothing after it.
fn declared_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// A file passes when its declared extension is allowed and, if the magic
/// bytes identify a type, that type's extension agrees with the declared one
/// and is itself allowed. Undetectable content (plain text and friends)
/// falls back to the declared-extension check alone.
fn extension_allowed(file: &UploadedFile, allowed: &[String]) -> bool {
    let Some(declared) = declared_extension(&file.name) else {
        return false;
    };
    if !allowed.iter().any(|e| *e == declared) {
        return false;
    }
    match infer::get(&file.data) {
        Some(kind) => {
            let sniffed = kind.extension();
            sniffed == declared && allowed.iter().any(|e| e == sniffed)
        }
        None => true,
    }
}
