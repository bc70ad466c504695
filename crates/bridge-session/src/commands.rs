//! Client commands served by the session.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use bridge_frontend::{Callback, CommandFailure, CommandHandler};
use bridge_protocol::Args;
use serde::Serialize;
use serde_json::{json, Value};

use crate::body::{
    BreakpointBody, BreakpointsBody, EvaluateBody, ScopeBody, SourceBody, StackFrameBody,
    StackTraceBody, VariableBody, VariablesBody,
};
use crate::breakpoint::is_managed_source;
use crate::channel::{ChannelError, DebugChannel, Handle, ThreadInfo, ValueRef};
use crate::error::CommandError;
use crate::evaluate::evaluate_expression;
use crate::session::{Phase, Session};

type Reply = Result<Option<Value>, CommandError>;

/// The session's command list, bound to a weak session reference.
pub struct SessionCommands {
    session: Weak<Session>,
}

impl SessionCommands {
    /// Bind commands to `session`.
    pub fn new(session: Weak<Session>) -> Self {
        Self { session }
    }

    fn bind(&self, command: fn(&Session, Args) -> Reply) -> Callback {
        let session = self.session.clone();
        Arc::new(move |args| {
            let session = session
                .upgrade()
                .ok_or_else(|| CommandFailure::from(CommandError::Disposed))?;
            command(&session, args).map_err(CommandFailure::from)
        })
    }
}

impl CommandHandler for SessionCommands {
    fn handler_name(&self) -> &str {
        "Session"
    }

    fn commands(&self) -> Vec<(&'static str, Callback)> {
        vec![
            ("testCommand", self.bind(Session::test_command)),
            ("setSettings", self.bind(Session::set_settings)),
            ("next", self.bind(Session::next)),
            ("stepIn", self.bind(Session::step_in)),
            ("stepOut", self.bind(Session::step_out)),
            ("continue", self.bind(Session::resume)),
            ("pause", self.bind(Session::pause)),
            ("stackTrace", self.bind(Session::stack_trace)),
            ("scopes", self.bind(Session::scopes)),
            ("variables", self.bind(Session::variables)),
            ("threads", self.bind(Session::threads)),
            ("setBreakpoints", self.bind(Session::set_breakpoints)),
            ("evaluate", self.bind(Session::evaluate)),
        ]
    }
}

fn body<T: Serialize>(value: T) -> Reply {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| CommandError::Encode(e.to_string()))
}

fn handle_arg(args: &Args, name: &str) -> Handle {
    Handle::try_from(args.i64_or(name, 0)).unwrap_or(0)
}

/// Wait on every value's readiness at once.
fn wait_all(values: &[ValueRef]) {
    std::thread::scope(|scope| {
        for value in values {
            scope.spawn(move || value.wait_ready());
        }
    });
}

impl Session {
    fn test_command(&self, args: Args) -> Reply {
        let _state = self.lock();
        Ok(Some(json!({
            "result": "this works!",
            "passedArgs": args.into_value(),
        })))
    }

    fn set_settings(&self, args: Args) -> Reply {
        self.lock().settings.apply(&args);
        Ok(None)
    }

    fn next(&self, _args: Args) -> Reply {
        self.resume_with("Stepping over", |channel| channel.next_line())
    }

    fn step_in(&self, _args: Args) -> Reply {
        self.resume_with("Stepping in", |channel| channel.step_line())
    }

    fn step_out(&self, _args: Args) -> Reply {
        self.resume_with("Stepping out", |channel| channel.finish())
    }

    fn resume(&self, _args: Args) -> Reply {
        self.resume_with("Continuing", |channel| channel.resume())
    }

    /// Wait for the debuggee to stop, then resume it with `primitive`.
    /// Does nothing if it is already running or has exited.
    fn resume_with(
        &self,
        action: &str,
        primitive: fn(&dyn DebugChannel) -> Result<(), ChannelError>,
    ) -> Reply {
        let state = self.lock();
        let mut state = self.wait_for_suspend(state)?;

        if !self.channel.is_running() && !self.channel.has_exited() {
            tracing::info!("{}", action);
            primitive(self.channel.as_ref())?;
            state.suspend.resumed();
            state.phase = Phase::Running;
        }
        Ok(None)
    }

    fn pause(&self, _args: Args) -> Reply {
        let _state = self.lock();
        if self.channel.is_running() {
            tracing::info!("Pausing");
            self.channel.stop()?;
        }
        Ok(None)
    }

    fn stack_trace(&self, args: Args) -> Reply {
        let levels = args
            .i64_or("levels", i64::from(self.config.default_stack_levels))
            .max(0) as usize;
        let requested = args.get("threadId").and_then(Value::as_i64);

        let state = self.lock();
        let mut state = self.wait_for_suspend(state)?;

        let active = self.channel.active_thread().map(|t| t.id);
        let thread = match (requested, active) {
            (Some(id), Some(active)) if id == active => id,
            (Some(id), _) => {
                self.channel.set_active_thread(id)?;
                id
            }
            (None, Some(active)) => active,
            (None, None) => {
                return body(StackTraceBody {
                    stack_frames: Vec::new(),
                    total_frame_count: 0,
                })
            }
        };

        let total = self.channel.frame_count(thread)?;
        let frames = self.channel.frames(thread, 0, total.min(levels))?;

        let mut stack_frames = Vec::with_capacity(frames.len());
        for frame in frames {
            let (source, hint) = SourceBody::describe(&state.settings, frame.file.as_deref());
            let line = state.settings.to_client_line(frame.line);
            let name = frame.method.clone();
            let id = state.frames.insert(frame);
            stack_frames.push(StackFrameBody {
                id,
                name,
                source,
                line,
                column: 0,
                hint,
            });
        }

        body(StackTraceBody {
            stack_frames,
            total_frame_count: total,
        })
    }

    fn scopes(&self, args: Args) -> Reply {
        let frame_id = handle_arg(&args, "frameId");
        let mut state = self.lock();
        let frame = state
            .frames
            .get(frame_id)
            .cloned()
            .ok_or(CommandError::InvalidHandle(frame_id))?;

        let mut scopes = Vec::new();
        let innermost_of_active =
            frame.index == 0 && self.channel.active_thread().map(|t| t.id) == Some(frame.thread);

        match state.current_exception.clone() {
            Some(exception) if innermost_of_active => {
                let id = state.variables.insert(vec![exception]);
                scopes.push(ScopeBody {
                    name: "Exception",
                    variable_set_id: id,
                    expensive: false,
                });
            }
            _ => {
                let values = self.channel.frame_locals(&frame)?.into_values();
                if !values.is_empty() {
                    let id = state.variables.insert(values);
                    scopes.push(ScopeBody {
                        name: "Local",
                        variable_set_id: id,
                        expensive: false,
                    });
                }
            }
        }

        body(scopes)
    }

    fn variables(&self, args: Args) -> Reply {
        let set_id = handle_arg(&args, "variableSetId");
        let offset = args.i64_or("variableOffset", 0).max(0) as usize;

        let state = self.lock();
        let mut state = self.wait_for_suspend(state)?;

        let mut values: Vec<ValueRef> = state
            .variables
            .get(set_id)
            .map(|set| set.iter().skip(offset).cloned().collect())
            .unwrap_or_default();

        let max = self.config.max_variable_children;
        let more_exist = values.len() > max;
        values.truncate(max);

        if values.len() > self.config.parallel_wait_threshold {
            for value in &values {
                value.wait_ready();
            }
        } else {
            wait_all(&values);
        }

        let variables = values
            .iter()
            .map(|value| VariableBody::describe(value, &mut state.variables))
            .collect();

        body(VariablesBody {
            variables,
            more_exist,
        })
    }

    fn threads(&self, _args: Args) -> Reply {
        let state = self.lock();

        let mut threads: BTreeMap<_, _> = state
            .seen_threads
            .iter()
            .map(|(&id, name)| (id, ThreadInfo::new(id, name.clone())))
            .collect();

        if let Some(process) = &state.process {
            for thread in self.channel.threads(process)? {
                threads.entry(thread.id).or_insert(thread);
            }
        }

        body(threads.into_values().collect::<Vec<_>>())
    }

    fn set_breakpoints(&self, args: Args) -> Reply {
        let source = args
            .str("source")
            .or_else(|| {
                args.get("source")
                    .and_then(|s| s.get("path"))
                    .and_then(Value::as_str)
            })
            .ok_or(CommandError::MissingArgument("source"))?;
        let lines: Vec<i64> = args.array("lines").iter().filter_map(Value::as_i64).collect();

        let mut state = self.lock();
        let file = state.settings.to_debugger_path(source)?;

        if !is_managed_source(&file, &self.config.source_extensions) {
            tracing::info!("Ignoring breakpoints for {}", file.display());
            return body(BreakpointsBody {
                breakpoints: Vec::new(),
            });
        }

        let debugger_lines: Vec<i64> = lines
            .iter()
            .map(|&line| state.settings.to_debugger_line(line))
            .collect();

        let channel = &self.channel;
        let placed = state.breakpoints.reconcile(
            &file,
            &debugger_lines,
            |path, line| channel.insert_breakpoint(path, line),
            |handle| channel.remove_breakpoint(handle),
        )?;

        let breakpoints = placed
            .iter()
            .map(|p| BreakpointBody {
                id: p.id,
                installed: true,
                line: state.settings.to_client_line(p.line),
            })
            .collect();

        body(BreakpointsBody { breakpoints })
    }

    fn evaluate(&self, args: Args) -> Reply {
        let frame_id = handle_arg(&args, "frameId");

        let state = self.lock();
        let mut state = self.wait_for_suspend(state)?;

        let frame = state.frames.get(frame_id).cloned();
        let channel = &self.channel;
        let value = evaluate_expression(
            args.str("expression"),
            frame.as_ref(),
            |frame, expr| channel.validate_expression(frame, expr),
            |frame, expr| channel.evaluate(frame, expr),
        )?;

        let described = VariableBody::describe(&value, &mut state.variables);
        body(EvaluateBody {
            result: described.value,
            type_name: described.type_name,
            children_set_id: described.children_set_id,
        })
    }
}
