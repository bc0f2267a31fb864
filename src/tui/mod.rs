//! Terminal shell over the flow controller. Keys map onto controller
//! operations; everything shown is read back from controller state.

mod render;

use std::collections::BTreeSet;
use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::editor::{move_index, Activation, FocusDirection};
use crate::flow::{Controller, Effect, Screen};

/// View-local state: list cursors, repository marks and the input buffer.
pub struct App {
    pub should_quit: bool,
    pub cursor: usize,
    /// Marked rows on the repository screen, in list order.
    pub marked: BTreeSet<usize>,
    /// Typed input for the focused editor row while editing.
    pub input: Option<String>,
    wrap_focus: bool,
    screen: Screen,
}

impl App {
    pub fn new(wrap_focus: bool) -> Self {
        Self {
            should_quit: false,
            cursor: 0,
            marked: BTreeSet::new(),
            input: None,
            wrap_focus,
            screen: Screen::Orgs,
        }
    }

    /// Reset view state when the controller has moved to another screen,
    /// and keep the cursor inside the current list.
    pub fn sync_screen(&mut self, controller: &Controller) {
        let screen = controller.state().screen;
        if screen != self.screen {
            self.screen = screen;
            self.cursor = 0;
            self.marked.clear();
            self.input = None;
        }
        let len = list_len(controller);
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn handle_key(&mut self, controller: &mut Controller, key: KeyEvent) -> Option<Effect> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }
        if self.input.is_some() {
            self.handle_input_key(controller, key);
            return None;
        }
        if controller.state().screen == Screen::Editor && controller.editor().picker().is_some() {
            self.handle_picker_key(controller, key);
            return None;
        }
        if key.code == KeyCode::Char('q') {
            self.should_quit = true;
            return None;
        }

        let effect = match controller.state().screen {
            Screen::Orgs => self.handle_orgs_key(controller, key),
            Screen::Repos => self.handle_repos_key(controller, key),
            Screen::Branches => self.handle_branches_key(controller, key),
            Screen::Editor => self.handle_editor_key(controller, key),
            Screen::Preview => match key.code {
                KeyCode::Enter | KeyCode::Char('y') => controller.confirm_preview(),
                KeyCode::Esc | KeyCode::Char('n') => controller.back(),
                _ => None,
            },
            Screen::Templates => self.handle_templates_key(controller, key),
        };
        self.sync_screen(controller);
        effect
    }

    fn handle_orgs_key(&mut self, controller: &mut Controller, key: KeyEvent) -> Option<Effect> {
        match key.code {
            KeyCode::Enter => {
                let org = controller.state().organizations.get(self.cursor).cloned()?;
                controller.choose_org(org)
            }
            KeyCode::Char('t') => {
                controller.open_templates();
                None
            }
            KeyCode::Esc => controller.back(),
            code => {
                self.move_cursor(controller, code);
                None
            }
        }
    }

    fn handle_repos_key(&mut self, controller: &mut Controller, key: KeyEvent) -> Option<Effect> {
        match key.code {
            KeyCode::Char(' ') => {
                if !self.marked.remove(&self.cursor) {
                    self.marked.insert(self.cursor);
                }
                None
            }
            KeyCode::Enter => {
                let available = &controller.state().available_repos;
                let chosen: Vec<_> = if self.marked.is_empty() {
                    available.get(self.cursor).cloned().into_iter().collect()
                } else {
                    self.marked
                        .iter()
                        .filter_map(|&index| available.get(index).cloned())
                        .collect()
                };
                controller.choose_repos(chosen)
            }
            KeyCode::Char('t') => {
                controller.open_templates();
                None
            }
            KeyCode::Esc => controller.back(),
            code => {
                self.move_cursor(controller, code);
                None
            }
        }
    }

    fn handle_branches_key(&mut self, controller: &mut Controller, key: KeyEvent) -> Option<Effect> {
        match key.code {
            KeyCode::Enter => {
                let branch = controller.state().branches.get(self.cursor)?.name.clone();
                controller.choose_branch(&branch)
            }
            KeyCode::Esc => controller.back(),
            code => {
                self.move_cursor(controller, code);
                None
            }
        }
    }

    fn handle_editor_key(&mut self, controller: &mut Controller, key: KeyEvent) -> Option<Effect> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => {
                controller
                    .editor_mut()
                    .move_focus(FocusDirection::Previous, self.wrap_focus);
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                controller
                    .editor_mut()
                    .move_focus(FocusDirection::Next, self.wrap_focus);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Activation::Edit(current) = controller.activate_editor_field() {
                    self.input = Some(current);
                }
            }
            KeyCode::Char('p') => controller.confirm_editor(),
            KeyCode::Char('s') => controller.save_template(),
            KeyCode::Char('t') => controller.open_templates(),
            KeyCode::Esc => return controller.back(),
            _ => {}
        }
        None
    }

    fn handle_templates_key(&mut self, controller: &mut Controller, key: KeyEvent) -> Option<Effect> {
        match key.code {
            KeyCode::Enter => {
                if let Some(name) = self.selected_template(controller) {
                    controller.load_template(&name);
                }
                None
            }
            KeyCode::Char('d') => {
                if let Some(name) = self.selected_template(controller) {
                    controller.delete_template(&name);
                }
                None
            }
            KeyCode::Esc => controller.back(),
            code => {
                self.move_cursor(controller, code);
                None
            }
        }
    }

    fn handle_input_key(&mut self, controller: &mut Controller, key: KeyEvent) {
        let Some(buffer) = self.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Enter => {
                let raw = std::mem::take(buffer);
                self.input = None;
                if !controller.editor_mut().edit_focused_field(&raw) {
                    debug!(input = %raw, "input ignored");
                }
            }
            KeyCode::Esc => self.input = None,
            _ => {}
        }
    }

    fn handle_picker_key(&mut self, controller: &mut Controller, key: KeyEvent) {
        let editor = controller.editor_mut();
        match key.code {
            KeyCode::Enter => editor.confirm_picker(),
            KeyCode::Esc => editor.cancel_picker(),
            code => {
                let Some(picker) = editor.picker_mut() else {
                    return;
                };
                match code {
                    KeyCode::Up | KeyCode::Char('k') => {
                        picker.move_focus(FocusDirection::Previous, self.wrap_focus)
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        picker.move_focus(FocusDirection::Next, self.wrap_focus)
                    }
                    KeyCode::Char(' ') => picker.toggle_focused(),
                    _ => {}
                }
            }
        }
    }

    fn move_cursor(&mut self, controller: &Controller, code: KeyCode) {
        let direction = match code {
            KeyCode::Up | KeyCode::Char('k') => FocusDirection::Previous,
            KeyCode::Down | KeyCode::Char('j') => FocusDirection::Next,
            _ => return,
        };
        self.cursor = move_index(self.cursor, list_len(controller), direction, self.wrap_focus);
    }

    fn selected_template(&self, controller: &Controller) -> Option<String> {
        controller
            .state()
            .templates
            .get(self.cursor)
            .map(|template| template.name.clone())
    }
}

fn list_len(controller: &Controller) -> usize {
    let state = controller.state();
    match state.screen {
        Screen::Orgs => state.organizations.len(),
        Screen::Repos => state.available_repos.len(),
        Screen::Branches => state.branches.len(),
        Screen::Templates => state.templates.len(),
        Screen::Editor | Screen::Preview => 0,
    }
}

/// Draw, read keys and drive effects until the operator quits. The frame
/// is redrawn before each effect so the loading state is visible.
pub async fn run(
    terminal: &mut ratatui::DefaultTerminal,
    controller: &mut Controller,
    start: Effect,
    wrap_focus: bool,
) -> io::Result<()> {
    let mut app = App::new(wrap_focus);
    let mut pending = Some(start);

    loop {
        terminal.draw(|frame| render::render(frame, &app, controller))?;

        if let Some(effect) = pending.take() {
            pending = controller.run(effect).await;
            app.sync_screen(controller);
            continue;
        }

        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    pending = app.handle_key(controller, key);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
