use std::path::Path;

use anyhow::{Context, Result};
use shaorma_store::Session;

pub fn run(
    session: &Session,
    data_dir: &Path,
    name: Option<&str>,
    image: Option<&Path>,
    json: bool,
) -> Result<()> {
    if let Some(name) = name
        && !session.set_user_name(name)
    {
        anyhow::bail!("could not save the user name");
    }

    if let Some(image) = image {
        session
            .import_profile_image(image, data_dir)
            .with_context(|| format!("could not import profile image {}", image.display()))?;
    }

    let profile = session.profile();

    if json {
        let value = serde_json::json!({
            "name": profile.name,
            "image_path": profile.image_path,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Name:  {}", profile.name);
    match &profile.image_path {
        Some(path) => println!("Image: {}", path.display()),
        None => println!("Image: (none)"),
    }

    Ok(())
}
