#![no_main]

//! Interprets the input as a script of structured control-flow commands, builds the graph
//! through `GraphBuilder` and requires finalization (with verification) to succeed.
//! Structured programs are always reducible, so any error or panic is a finding.

use irgraph::prelude::*;
use libfuzzer_sys::fuzz_target;

const LOCALS: usize = 4;
const MAX_NESTING: usize = 60;

enum Frame {
    If {
        else_block: BlockId,
        then_end: Option<BlockId>,
        in_else: bool,
    },
    While {
        header: BlockId,
        exit: BlockId,
        break_block: Option<BlockId>,
    },
    /// Construct opened in dead code.
    Dead,
}

struct Script<'a> {
    data: &'a [u8],
    position: usize,
}

impl Script<'_> {
    fn next(&mut self) -> Option<u8> {
        let byte = self.data.get(self.position).copied();
        self.position += 1;
        byte
    }
}

fn close(builder: &mut GraphBuilder, frame: Frame, marker: u32) -> Result<()> {
    match frame {
        Frame::If {
            else_block,
            then_end,
            in_else,
        } => {
            let (then_end, else_end) = if in_else {
                (then_end, builder.current_block())
            } else {
                (builder.current_block(), Some(else_block))
            };
            let join = builder.create_join(then_end, else_end)?;
            builder.set_current_block(join);
        }
        Frame::While {
            header,
            exit,
            break_block,
        } => {
            let body_exit = builder.current_block();
            let after = builder.create_loop(
                header,
                body_exit,
                Some(exit),
                break_block,
                LoopMarker(marker),
            )?;
            builder.set_current_block(after);
        }
        Frame::Dead => {}
    }
    Ok(())
}

fn run(data: &[u8]) -> Result<Graph> {
    let mut builder = GraphBuilder::with_config(GraphConfig::strict(), 1, 0, LOCALS);
    let mut frames: Vec<Frame> = Vec::new();
    let mut script = Script { data, position: 0 };
    let mut marker = 0u32;

    while let Some(command) = script.next() {
        let live = builder.current_block().is_some();
        match command % 8 {
            0 if live => {
                let local = usize::from(script.next().unwrap_or(0)) % LOCALS;
                let value = builder.constant(i64::from(command));
                builder.environment_mut()?.bind_local(local, value)?;
            }
            1 if live => {
                let local = usize::from(script.next().unwrap_or(0)) % LOCALS;
                let input = builder.environment()?.local(local)?;
                let result = builder.add_instruction(Opcode::new("op"), vec![input])?;
                builder.environment_mut()?.bind_local(local, result)?;
            }
            2 | 5 if frames.len() >= MAX_NESTING => {}
            2 if live => {
                let condition = builder.environment()?.parameter(0)?;
                let (if_true, if_false) = builder.branch(condition)?;
                builder.set_current_block(Some(if_true));
                frames.push(Frame::If {
                    else_block: if_false,
                    then_end: None,
                    in_else: false,
                });
            }
            3 => {
                if let Some(Frame::If {
                    else_block,
                    then_end,
                    in_else,
                }) = frames.last_mut()
                {
                    if !*in_else {
                        *then_end = builder.current_block();
                        *in_else = true;
                        builder.set_current_block(Some(*else_block));
                    }
                }
            }
            4 => {
                if let Some(frame) = frames.pop() {
                    marker += 1;
                    close(&mut builder, frame, marker)?;
                }
            }
            5 if live => {
                let header = builder.loop_entry()?;
                let input = builder.environment()?.local(0)?;
                let condition = builder.add_instruction(Opcode::new("test"), vec![input])?;
                let (body, exit) = builder.branch(condition)?;
                builder.set_current_block(Some(body));
                frames.push(Frame::While {
                    header,
                    exit,
                    break_block: None,
                });
            }
            2 | 5 => frames.push(Frame::Dead),
            6 if live => {
                let innermost = frames
                    .iter_mut()
                    .rev()
                    .find_map(|frame| match frame {
                        Frame::While { break_block, .. } => Some(break_block),
                        _ => None,
                    });
                if let Some(slot) = innermost {
                    let target = match *slot {
                        Some(block) => block,
                        None => {
                            let block = builder.create_block()?;
                            *slot = Some(block);
                            block
                        }
                    };
                    builder.goto(target)?;
                }
            }
            7 if live => {
                let value = builder.environment()?.local(0)?;
                builder.return_value(Some(value))?;
            }
            _ => {}
        }
    }

    while let Some(frame) = frames.pop() {
        marker += 1;
        close(&mut builder, frame, marker)?;
    }
    if builder.current_block().is_some() {
        builder.return_value(None)?;
    }
    builder.finalize()
}

fuzz_target!(|data: &[u8]| {
    if let Err(error) = run(data) {
        panic!("structured script rejected: {error}");
    }
});
