//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# wv2 configuration
# Only override what you want to change -- missing fields use defaults.

[environment]
# Empty strings leave the runtime default in place.
# browser_executable_folder = ""      # fixed-version runtime folder
# user_data_folder = ""
# additional_browser_arguments = ""   # e.g. "--disable-gpu"
# language = ""                       # BCP 47 tag, e.g. "en-US"
# target_compatible_browser_version = ""
# allow_single_sign_on_using_os_primary_account = false

[page.settings]
# is_script_enabled = true
# is_web_message_enabled = true
# are_default_script_dialogs_enabled = true
# is_status_bar_enabled = true
# are_dev_tools_enabled = true
# are_default_context_menus_enabled = true
# is_zoom_control_enabled = true
# is_built_in_error_page_enabled = true

[logging]
# level = "INFO"                      # TRACE, DEBUG, INFO, WARN, ERROR
"##
    .to_string()
}
