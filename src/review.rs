use crate::history::{self, ReviewRecord};
use crate::report::describe_image;
use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, MultiSelect, Select};
use simgroup::SimilarityGroup;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Next,
    Previous,
    Choose,
    SelectAll,
    DeselectAll,
    Trash,
    Quit,
}

impl Action {
    const ALL: [Action; 7] = [
        Action::Next,
        Action::Previous,
        Action::Choose,
        Action::SelectAll,
        Action::DeselectAll,
        Action::Trash,
        Action::Quit,
    ];

    fn label(self) -> &'static str {
        match self {
            Action::Next => "Next group ▶",
            Action::Previous => "◀ Previous group",
            Action::Choose => "Choose images…",
            Action::SelectAll => "Select all",
            Action::DeselectAll => "Deselect all",
            Action::Trash => "🗑️  Move selected to trash",
            Action::Quit => "Quit",
        }
    }
}

/// Interactive walk over `groups`. Nothing is moved without confirmation.
pub fn review_groups(root: &Path, mut groups: Vec<SimilarityGroup>, dry_run: bool) -> Result<()> {
    let theme = ColorfulTheme::default();
    let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();
    let mut current = 0;

    while !groups.is_empty() {
        print_group(&groups[current], current, groups.len());

        let choice = Select::with_theme(&theme)
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()?;

        match Action::ALL[choice] {
            Action::Next => {
                if current + 1 < groups.len() {
                    current += 1;
                }
            }
            Action::Previous => current = current.saturating_sub(1),
            Action::Choose => {
                let group = &mut groups[current];
                let items: Vec<String> = group.paths().iter().map(|p| describe_image(p)).collect();
                let defaults: Vec<bool> = (0..group.len()).map(|i| group.is_selected(i)).collect();
                let chosen = MultiSelect::with_theme(&theme)
                    .with_prompt("Select images (space to toggle, enter to confirm)")
                    .items(&items)
                    .defaults(&defaults)
                    .interact()?;
                group.deselect_all();
                for i in chosen {
                    group.set_selected(i, true);
                }
            }
            Action::SelectAll => groups[current].select_all(),
            Action::DeselectAll => groups[current].deselect_all(),
            Action::Trash => {
                let selected = groups[current].selected_paths();
                if selected.is_empty() {
                    println!("Please select images to move first.");
                    continue;
                }
                let confirmed = Confirm::with_theme(&theme)
                    .with_prompt(format!(
                        "Move {} selected image(s) to the trash?",
                        selected.len()
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    continue;
                }

                let kept = groups[current].unselected_paths();
                let trashed = trash_paths(&selected, dry_run);
                if dry_run {
                    println!("\n⚠️  Dry-run only; no files were changed.");
                    continue;
                }
                if !trashed.is_empty() {
                    history::append_record(root, &ReviewRecord::trashed(&kept, &trashed))?;
                    println!("Moved {} image(s) to the trash", trashed.len());
                }
                current = remove_from_group(&mut groups, current, &trashed);
            }
            Action::Quit => return Ok(()),
        }
    }

    println!("All groups processed!");
    Ok(())
}

fn print_group(group: &SimilarityGroup, index: usize, total: usize) {
    println!(
        "\n✨ Group {} of {} ({} images):",
        index + 1,
        total,
        group.len()
    );
    for (i, path) in group.paths().iter().enumerate() {
        let mark = if group.is_selected(i) { "[x]" } else { "[ ]" };
        let dimensions = image::image_dimensions(path)
            .map(|(w, h)| format!("{}x{}", w, h))
            .unwrap_or_else(|_| "?x?".to_string());
        println!("   {} {} {}", mark, dimensions, describe_image(path));
    }
}

/// Move each path to the trash, returning the ones that were moved.
fn trash_paths(paths: &[PathBuf], dry_run: bool) -> Vec<PathBuf> {
    let mut moved = Vec::new();
    for path in paths {
        if dry_run {
            println!("   📦 [dry-run] TRASH {}", path.display());
            continue;
        }
        match trash::delete(path) {
            Ok(()) => {
                println!("   🗑️  Trashed {}", path.display());
                moved.push(path.clone());
            }
            Err(e) => {
                log::warn!("Failed to trash {}: {}", path.display(), e);
                eprintln!("⚠️  Failed to move {} to the trash: {}", path.display(), e);
            }
        }
    }
    moved
}

/// Drop `removed` from the current group, discarding the group if fewer than
/// two images remain. Returns the index of the group to show next.
fn remove_from_group(
    groups: &mut Vec<SimilarityGroup>,
    current: usize,
    removed: &[PathBuf],
) -> usize {
    groups[current].remove_paths(removed);
    if groups[current].len() < 2 {
        groups.remove(current);
    }
    current.min(groups.len().saturating_sub(1))
}
