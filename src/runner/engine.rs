//! Sequential topic execution with conditional re-evaluation
//!
//! Directives run in order. A conditional is evaluated when the walk
//! reaches it, and the conditionals that directly follow an executed task
//! are evaluated right after that task so they observe anything it changed.
//! Each conditional is evaluated at most once per pass.

use crate::directive::{Directive, DirectiveKind, TaskType};
use crate::error::{is_fatal_reference, ExecutionError, ExecutionResult};
use crate::notes::{BuildNote, Topic};
use crate::runner::variables::resolve_assignment;
use crate::runner::{substitute, ConditionEvaluator, Context, Evaluate, RunLogEntry, Task};
use crate::ui::{self, LogLevel};
use std::collections::HashMap;

/// Question asked before a topic with prerequisites runs
const PREREQ_QUESTION: &str = "Have the above prerequisites been met?";

/// Evaluation state of one conditional directive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionalState {
    pub evaluated: bool,
    pub result: bool,
    /// On a chain head: some branch of the chain has been taken
    pub matched_chain: bool,
    /// On `@elsif`/`@else`: index of the chain head
    pub parent_index: Option<usize>,
}

/// Conditional states for one pass over a topic, keyed by directive index
#[derive(Debug, Default)]
pub struct ConditionalTracker {
    states: HashMap<usize, ConditionalState>,
}

impl ConditionalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, index: usize) -> Option<&ConditionalState> {
        self.states.get(&index)
    }

    pub fn is_evaluated(&self, index: usize) -> bool {
        self.states.get(&index).is_some_and(|s| s.evaluated)
    }

    /// Whether every conditional on the path is evaluated and true
    pub fn gate(&self, path: &[usize]) -> bool {
        path.iter()
            .all(|idx| self.states.get(idx).is_some_and(|s| s.evaluated && s.result))
    }

    /// Evaluate the conditional at `index`
    pub fn evaluate_at(&mut self, index: usize, directives: &[Directive], ctx: &Context, evaluator: &dyn Evaluate) {
        match &directives[index].kind {
            DirectiveKind::If(condition) => {
                let result = evaluator.evaluate(condition, ctx);
                self.states.insert(index, chain_head(result));
            }
            DirectiveKind::Unless(condition) => {
                let result = !evaluator.evaluate(condition, ctx);
                self.states.insert(index, chain_head(result));
            }
            DirectiveKind::Elsif(condition) => {
                let parent = find_chain_head(directives, index);
                let result = match parent {
                    Some(p) if !self.chain_matched(p) => evaluator.evaluate(condition, ctx),
                    _ => false,
                };
                self.settle_branch(index, parent, result);
            }
            DirectiveKind::Else => {
                let parent = find_chain_head(directives, index);
                let result = parent.is_some_and(|p| !self.chain_matched(p));
                self.settle_branch(index, parent, result);
            }
            _ => {}
        }
    }

    fn chain_matched(&self, head: usize) -> bool {
        self.states.get(&head).is_some_and(|s| s.matched_chain)
    }

    fn settle_branch(&mut self, index: usize, parent: Option<usize>, result: bool) {
        if result {
            if let Some(state) = parent.and_then(|p| self.states.get_mut(&p)) {
                state.matched_chain = true;
            }
        }
        self.states.insert(
            index,
            ConditionalState {
                evaluated: true,
                result,
                matched_chain: result,
                parent_index: parent,
            },
        );
    }

    /// Evaluate the run of conditionals directly after an executed task
    pub fn reevaluate_after(&mut self, task_index: usize, directives: &[Directive], ctx: &Context, evaluator: &dyn Evaluate) {
        for index in task_index + 1..directives.len() {
            if directives[index].kind.is_actionable() {
                break;
            }
            tracing::trace!(index, "re-evaluating conditional after task");
            self.evaluate_at(index, directives, ctx, evaluator);
        }
    }
}

fn chain_head(result: bool) -> ConditionalState {
    ConditionalState {
        evaluated: true,
        result,
        matched_chain: result,
        parent_index: None,
    }
}

/// Index of the `@if`/`@unless` that opens the chain `index` belongs to
fn find_chain_head(directives: &[Directive], index: usize) -> Option<usize> {
    let mut depth = 0usize;

    for i in (0..index).rev() {
        let kind = &directives[i].kind;
        if *kind == DirectiveKind::End {
            depth += 1;
        } else if kind.opens_chain() {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }

    None
}

/// Totals and output of one topic run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Postrequisites and the summary line, in display order
    pub output: Vec<String>,
    pub total: usize,
    pub errors: usize,
    /// The sequence stopped early because of a failure
    pub terminated: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.errors == 0 && !self.terminated
    }

    /// One-line summary of the run
    pub fn summary(&self) -> String {
        if self.errors == 0 {
            format!("✓ Ran {}", plural(self.total, "task"))
        } else if self.terminated {
            format!("✗ Ran {}, terminated due to error", plural(self.total, "task"))
        } else {
            format!(
                "✗ Completed {} with {}",
                plural(self.total, "task"),
                plural(self.errors, "error")
            )
        }
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Runs topics of one build note
pub struct Runner<'a> {
    note: &'a BuildNote,
    evaluator: Box<dyn Evaluate + 'a>,
}

impl<'a> Runner<'a> {
    pub fn new(note: &'a BuildNote) -> Self {
        Runner {
            note,
            evaluator: Box::new(ConditionEvaluator::with_note(note)),
        }
    }

    /// Use a different condition evaluator
    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluate + 'a>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn note(&self) -> &'a BuildNote {
        self.note
    }

    /// Find a topic by name and run it
    pub fn run_named(&self, name: &str, ctx: &mut Context) -> ExecutionResult<RunReport> {
        let topic = self
            .note
            .find_topic(name)
            .into_iter()
            .next()
            .ok_or_else(|| ExecutionError::TopicNotFound(name.to_string()))?;
        self.run_topic(topic, ctx, false)
    }

    /// Run a topic's directives
    ///
    /// Nested runs (includes) leave the summary line to the outermost run.
    pub fn run_topic(&self, topic: &Topic, ctx: &mut Context, nested: bool) -> ExecutionResult<RunReport> {
        if ctx.is_topic_in_stack(&topic.title) {
            return Err(ExecutionError::RecursiveInclude(topic.title.clone()));
        }

        tracing::debug!(
            topic = %topic.title,
            conditionals = topic.has_conditionals(),
            nested,
            "running topic"
        );
        topic.bind_arguments(ctx);

        if !topic.prereqs.is_empty() {
            for prereq in &topic.prereqs {
                ui::print_block(&substitute(prereq, ctx));
            }
            if !ctx.confirm(PREREQ_QUESTION, true) {
                return Err(ExecutionError::PrerequisiteDeclined(topic.title.clone()));
            }
        }

        ctx.push_topic(topic.title.clone());
        let result = self.run_sequence(topic, ctx);
        ctx.pop_topic();
        let mut report = result?;

        if !nested {
            report.output.push(report.summary());
        }
        for postreq in &topic.postreqs {
            report.output.push(substitute(postreq, ctx));
        }

        Ok(report)
    }

    fn run_sequence(&self, topic: &Topic, ctx: &mut Context) -> ExecutionResult<RunReport> {
        let directives = &topic.directives;
        let evaluator = self.evaluator.as_ref();
        let mut tracker = ConditionalTracker::new();
        let mut current_log_level: Option<LogLevel> = None;
        let mut report = RunReport::default();

        for (index, directive) in directives.iter().enumerate() {
            if directive.kind.is_conditional() {
                if !tracker.is_evaluated(index) {
                    tracker.evaluate_at(index, directives, ctx, evaluator);
                }
                continue;
            }

            if !tracker.gate(&directive.conditional_path) {
                if let Some(spec) = directive.task() {
                    ctx.print_task_skip(&spec.title, "condition not met");
                }
                continue;
            }

            let spec = match &directive.kind {
                DirectiveKind::LogLevel(level) => {
                    current_log_level = Some(*level);
                    continue;
                }
                DirectiveKind::SetVar { name, value } => {
                    let value = resolve_assignment(name, value, ctx);
                    ctx.set_var(name.clone(), value);
                    continue;
                }
                DirectiveKind::Task(spec) => spec,
                _ => continue,
            };

            let task = Task::from_spec(spec, topic, current_log_level);
            let title = task.display_title(ctx);

            if task.optional && !ctx.confirm(&format!("Run {}?", title), task.default_answer) {
                ctx.print_task_skip(&title, "declined");
                continue;
            }

            let stop = match task.execute(ctx, self) {
                Ok(outcome) => {
                    report.total += outcome.total;
                    report.errors += outcome.errors;
                    report.output.extend(outcome.output);

                    if task.task_type != TaskType::Include {
                        ctx.record(RunLogEntry {
                            task_title: title.clone(),
                            topic_title: topic.title.clone(),
                            success: outcome.success,
                            exit_status: outcome.exit_status,
                        });
                    }

                    if !outcome.success {
                        ctx.print_error(&format!("{} failed", title));
                    }
                    !outcome.success && !ctx.options.force
                }
                Err(e @ ExecutionError::PrerequisiteDeclined(_)) => return Err(e),
                Err(e) => {
                    report.total += 1;
                    report.errors += 1;
                    ctx.print_error(&format!("{}: {}", title, e));

                    if task.task_type != TaskType::Include {
                        ctx.record(RunLogEntry {
                            task_title: title.clone(),
                            topic_title: topic.title.clone(),
                            success: false,
                            exit_status: None,
                        });
                    }
                    is_fatal_reference(&e) || !ctx.options.force
                }
            };

            if stop {
                report.terminated = true;
                break;
            }

            tracker.reevaluate_after(index, directives, ctx, evaluator);
        }

        Ok(report)
    }
}
