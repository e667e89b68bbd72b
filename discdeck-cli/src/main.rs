use discdeck_core::{
    error::Error,
    library::{Command, Library},
    model::{capped, Track, DEFAULT_SLOTS, MAX_ALBUM_LEN, MAX_ARTIST_LEN},
};
use std::{env, io, io::BufRead, path::PathBuf};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    if let Err(err) = run(data_dir) {
        log::error!("fatal: {}", err);
        std::process::exit(1);
    }
}

fn run(data_dir: PathBuf) -> Result<(), Error> {
    let mut library = Library::open(data_dir)?;
    println!(
        "discdeck: {} changers, current {:?} ({} slots)",
        library.changers().len(),
        library.current_changer().map(|c| c.name.as_str()).unwrap_or("-"),
        library.total_slots(),
    );
    println!("commands: ls, show N, set N ARTIST;ALBUM, track N TITLE;SECS, clear N, changers, switch ID, add NAME SLOTS, stats, q");

    // Input events land on the command queue; the loop tick below drains it,
    // so no file I/O runs while a line is being dispatched.
    let sender = library.sender();

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let mut words = line.splitn(2, ' ');
        let verb = words.next().unwrap_or("");
        let rest = words.next().unwrap_or("").trim();

        match verb {
            "q" | "quit" => break,
            "ls" => {
                for slot in library.window().slots() {
                    if slot.occupied {
                        println!("{:>3}: {} - {}", slot.slot_number, slot.cd.artist, slot.cd.album);
                    } else {
                        println!("{:>3}: [empty]", slot.slot_number);
                    }
                }
            }
            "show" => {
                let Some(logical) = parse_slot_arg(rest, &mut library) else {
                    continue;
                };
                match library.slot(logical) {
                    Some(slot) if slot.occupied => {
                        let cd = &slot.cd;
                        println!("slot {}: {} - {} ({})", slot.slot_number, cd.artist, cd.album, cd.year);
                        for track in &cd.tracks {
                            println!("  {:>2}. {} [{}s]", track.number, track.title, track.duration);
                        }
                        if !cd.notes.is_empty() {
                            println!("  notes: {}", cd.notes);
                        }
                    }
                    Some(_) => println!("slot {} is empty", logical + 1),
                    None => println!("slot {} is not cached", logical + 1),
                }
            }
            "set" => {
                let Some((logical, fields)) = rest.split_once(' ') else {
                    println!("usage: set N ARTIST;ALBUM");
                    continue;
                };
                let Some(logical) = parse_slot_arg(logical, &mut library) else {
                    continue;
                };
                let (artist, album) = fields.split_once(';').unwrap_or((fields, ""));
                if let Some(slot) = library.slot_mut(logical) {
                    slot.occupied = true;
                    slot.cd.artist = capped(artist.trim(), MAX_ARTIST_LEN);
                    slot.cd.album = capped(album.trim(), MAX_ALBUM_LEN);
                }
            }
            "track" => {
                let Some((logical, fields)) = rest.split_once(' ') else {
                    println!("usage: track N TITLE;SECS");
                    continue;
                };
                let Some(logical) = parse_slot_arg(logical, &mut library) else {
                    continue;
                };
                let (title, secs) = fields.split_once(';').unwrap_or((fields, ""));
                if let Some(slot) = library.slot_mut(logical) {
                    let number = slot.cd.track_count() as i32 + 1;
                    slot.cd.add_track(Track::new(number, title.trim(), secs.trim()));
                }
            }
            "clear" => {
                if let Some(logical) = parse_slot_arg(rest, &mut library) {
                    if let Some(slot) = library.slot_mut(logical) {
                        slot.clear();
                    }
                }
            }
            "changers" => {
                let current = library.current_changer().map(|c| c.id.clone());
                for changer in library.changers() {
                    let marker = if Some(&changer.id) == current.as_ref() { "*" } else { " " };
                    println!(
                        "{} {} {:?} @ {:?} ({} slots)",
                        marker, changer.id, changer.name, changer.location, changer.total_slots,
                    );
                }
            }
            "switch" => {
                // Queued, not executed inline; the tick below picks it up.
                let _ = sender.send(Command::SwitchChanger { id: rest.to_string() });
            }
            "add" => {
                let (name, slots) = rest.rsplit_once(' ').unwrap_or((rest, ""));
                let slots = slots.parse().unwrap_or(DEFAULT_SLOTS);
                match library.add_changer(name, "", slots) {
                    Ok(id) => println!("added {}", id),
                    Err(err) => println!("cannot add changer: {}", err),
                }
            }
            "stats" => {
                println!("{} of {} slots occupied", library.occupied_count(), library.total_slots());
            }
            "" => {}
            other => println!("unknown command {:?}", other),
        }

        // Main loop tick: drain deferred switches outside input dispatch.
        if let Err(err) = library.handle_pending() {
            println!("changer switch failed: {}", err);
        }
    }

    library.flush()?;
    Ok(())
}

/// Parses a 1-based slot number and recentres the cache on it.
fn parse_slot_arg(arg: &str, library: &mut Library) -> Option<i32> {
    let number: i32 = match arg.trim().parse() {
        Ok(number) => number,
        Err(_) => {
            println!("expected a slot number, got {:?}", arg);
            return None;
        }
    };
    if number < 1 || number > library.total_slots() {
        println!("slot {} is out of range", number);
        return None;
    }
    let logical = number - 1;
    if let Err(err) = library.ensure_visible(logical) {
        println!("cannot load slot {}: {}", number, err);
        return None;
    }
    Some(logical)
}
