use geminitts_core::voice::VoiceCatalog;

use crate::console::Console;

pub fn run(console: &Console) {
    let catalog = VoiceCatalog::gemini();

    console.print_system("Available voice list:");
    for (index, category) in catalog.categories().enumerate() {
        if index > 0 {
            console.print_system("");
        }
        console.print_system(&format!("{category} voices:"));
        for voice in catalog.voices(category) {
            console.print_system(&format!("  {voice}"));
        }
    }
}
