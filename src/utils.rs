use color_eyre::config::HookBuilder;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use directories::ProjectDirs;
use std::panic;
use std::path::PathBuf;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "gifscroll").ok_or_else(|| eyre!("failed to get home directory"))
}

pub fn get_config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn get_data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn initialize_panic_handler() -> Result<()> {
    let (panic_hook, eyre_hook) = HookBuilder::default().into_hooks();
    eyre_hook.install()?;

    let panic_hook = panic_hook.into_panic_hook();
    panic::set_hook(Box::new(move |panic_info| {
        log::error!("panic: {panic_info}");
        panic_hook(panic_info);
    }));
    Ok(())
}
