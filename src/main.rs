mod render;
mod storage;

use std::{cell::RefCell, io, rc::Rc};

use ratzilla::event::KeyCode;
use ratzilla::ratatui::Terminal;
use ratzilla::{DomBackend, WebRenderer};

use pyramid_scheme::app::{App, Command};
use pyramid_scheme::GameConfig;

fn now_ms() -> f64 {
    js_sys::Date::now()
}

fn run_command(app: &mut App, command: Command) {
    match command {
        Command::Save => storage::save_session(&mut app.session, now_ms()),
        Command::WipeSave => {
            storage::delete_save();
            storage::save_session(&mut app.session, now_ms());
        }
    }
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();

    let restored = storage::load_session(GameConfig::default(), now_ms());
    let app = Rc::new(RefCell::new(App::new(restored.session, restored.offline)));
    let backend = DomBackend::new()?;
    let mut terminal = Terminal::new(backend)?;

    terminal.on_key_event({
        let app = app.clone();
        move |key_event| {
            let mut app = app.borrow_mut();
            let key = match key_event.code {
                KeyCode::Char(c) => c.to_ascii_lowercase(),
                KeyCode::Esc => 'q',
                _ => return,
            };
            if let Some(command) = app.handle_key(key) {
                run_command(&mut app, command);
            }
        }
    });

    terminal.draw_web(move |f| {
        let mut app = app.borrow_mut();
        if let Some(command) = app.frame(now_ms()) {
            run_command(&mut app, command);
        }
        render::render(f, &app);
    });

    Ok(())
}
