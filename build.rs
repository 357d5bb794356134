const COMMANDS: &[&str] = &["drag_new_window", "drag_back", "on_drop"];

fn main() {
    // Generates the allow/deny permission set for every command exposed to the guest
    tauri_plugin::Builder::new(COMMANDS)
        .global_api_script_path("./src/api-iife.js")
        .build();
}
