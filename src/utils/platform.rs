//! OS clipboard and opener shims

/// Put text on the system clipboard
pub fn copy_to_clipboard(text: &str) -> Result<(), String> {
    let mut clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    clipboard.set_text(text.to_string()).map_err(|e| e.to_string())
}

/// Open a URL or path with the platform's default handler
pub fn open_target(target: &str) -> Result<(), String> {
    open::that(target).map_err(|e| e.to_string())
}
