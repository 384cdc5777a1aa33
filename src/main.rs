//! Dice Tale entry point
//!
//! Native builds run a headless autoplayer: it loads a story, flicks the die
//! with random drags and prints each page as text. The browser build enters
//! through `platform::web` instead.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;

    use anyhow::{Context, Result, bail};
    use clap::Parser;
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use dice_tale::Game;
    use dice_tale::events::JsonLinesSink;
    use dice_tale::renderer::TextRenderer;
    use dice_tale::settings::Settings;
    use dice_tale::story::{LoadOptions, StoryData};

    /// Ticks allowed for the disc to settle between throws
    const SETTLE_TICKS: u32 = 3000;

    #[derive(Parser, Debug)]
    #[command(name = "dice-tale", about = "Play a branching story with a flickable d20")]
    struct Args {
        /// Story file (.csv or .json)
        story: PathBuf,

        /// Settings JSON file
        #[arg(long)]
        settings: Option<PathBuf>,

        /// RNG seed for rolls and the autoplayer
        #[arg(long)]
        seed: Option<u64>,

        /// Start page override
        #[arg(long)]
        start: Option<String>,

        /// Stop after this many throws
        #[arg(long, default_value_t = 50)]
        max_throws: u32,

        /// Write engine events as JSON lines to stderr
        #[arg(long)]
        events: bool,

        /// Only validate the story and report problems
        #[arg(long)]
        check: bool,
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let args = Args::parse();

        let mut settings = match &args.settings {
            Some(path) => Settings::from_json_file(path)
                .with_context(|| format!("reading settings {}", path.display()))?,
            None => Settings::load(),
        };
        if let Some(seed) = args.seed {
            settings.rules.seed = seed;
        }

        let options = LoadOptions {
            max_choices: settings.rules.max_choices,
            start_id: args.start.clone(),
        };
        let story = StoryData::from_path(&args.story, &options)
            .with_context(|| format!("loading story {}", args.story.display()))?;

        if args.check {
            return check(&story);
        }

        let seed = settings.rules.seed;
        let mut game =
            Game::new(settings).with_renderer(Box::new(TextRenderer::new(std::io::stdout())));
        if args.events {
            game.set_event_sink(Box::new(JsonLinesSink::new(std::io::stderr())));
        }
        game.load_story(story);

        autoplay(&mut game, seed, args.max_throws);
        Ok(())
    }

    fn check(story: &StoryData) -> Result<()> {
        let report = story.self_check();
        println!("pages: {}", story.len());
        println!("start: {} (exists: {})", story.start_id, report.start_exists);
        println!("start has title: {}", report.start_has_title);
        println!("start has flavor: {}", report.start_has_flavor);
        for message in &story.diagnostics {
            println!("warning: {}", message);
        }
        if !report.passed() {
            bail!("story self-check failed");
        }
        Ok(())
    }

    fn autoplay(game: &mut Game, seed: u64, max_throws: u32) {
        let mut rng = Pcg32::seed_from_u64(seed ^ 0xA070_91A7);

        for i in 0..game.preparation().options.len() {
            if rng.random::<bool>() {
                game.toggle_preparation(i);
            }
        }

        for _ in 0..max_throws {
            game.render();
            if game.story().is_terminal() || !game.is_ready() {
                break;
            }

            let fighting = game.story().encounter().is_some();
            if !fighting {
                let count = game.story().current_page().map_or(0, |p| p.choices.len());
                if count == 0 {
                    break;
                }
                let pick = rng.random_range(0..count);
                if game.select_choice(pick).is_err() {
                    break;
                }
                game.render();
            }

            flick(game, &mut rng);
            settle(game);
        }
        game.render();
    }

    fn flick(game: &mut Game, rng: &mut Pcg32) {
        let mut point = game.disc().pos;
        if !game.pointer_down(point) {
            return;
        }
        for _ in 0..4 {
            point += Vec2::new(rng.random_range(-30.0..30.0), rng.random_range(-30.0..30.0));
            game.pointer_move(point);
        }
        game.pointer_up();
    }

    fn settle(game: &mut Game) {
        for _ in 0..SETTLE_TICKS {
            game.tick();
            if game.disc().is_at_rest() && game.story().pending_transition().is_none() {
                break;
            }
        }
        game.advance_now();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::start
}
