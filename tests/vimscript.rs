use pretty_assertions::assert_eq;
use vim_core::{EditorOps, Engine, EngineError, Mode, ScriptErrorKind};

mod support;
use support::mock_buffer::MockBuffer;

fn global(eng: &Engine, name: &str) -> Option<String> {
    eng.shared().lock().script.globals.get(name).map(|v| v.display())
}

fn script_error(result: vim_core::Result<()>) -> ScriptErrorKind {
    match result {
        Err(EngineError::Script(err)) => err.kind,
        other => panic!("expected a script error, got {other:?}"),
    }
}

#[test]
fn test_user_function_returns_value() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    let script = "\
function! Add(a, b)
  return a:a + a:b
endfunction
let g:sum = Add(2, 3)
echo g:sum
";
    eng.source(&mut buf, script).unwrap();
    assert_eq!(eng.take_messages(), vec!["5".to_string()]);
    assert_eq!(global(&eng, "sum").as_deref(), Some("5"));
}

#[test]
fn test_loops() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    let script = "\
let g:total = 0
for i in range(1, 4)
  let g:total += i
endfor
let n = 3
while n > 0
  let n -= 1
  let g:total += 10
endwhile
echo g:total
";
    eng.source(&mut buf, script).unwrap();
    assert_eq!(eng.take_messages(), vec!["40".to_string()]);
}

#[test]
fn test_try_catch_finally() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    let script = "\
let g:log = []
try
  throw 'oops'
catch /^oo/
  call add(g:log, 'caught ' . v:exception)
finally
  call add(g:log, 'finally')
endtry
echo g:log
";
    eng.source(&mut buf, script).unwrap();
    assert_eq!(
        eng.take_messages(),
        vec!["['caught oops', 'finally']".to_string()]
    );
}

#[test]
fn test_uncaught_exception() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    let result = eng.source(&mut buf, "throw 'boom'");
    assert_eq!(script_error(result), ScriptErrorKind::Exception("boom".into()));
}

#[test]
fn test_function_recursion_limit() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    let script = "\
set maxfuncdepth=10
let g:calls = 0
function! Loop()
  let g:calls += 1
  call Loop()
endfunction
try
  call Loop()
catch /E132/
  echo 'caught' g:calls
endtry
";
    eng.source(&mut buf, script).unwrap();
    assert_eq!(eng.take_messages(), vec!["caught 10".to_string()]);

    let result = eng.execute_command_line(&mut buf, "call Loop()");
    assert_eq!(script_error(result), ScriptErrorKind::FunctionDepth);
}

#[test]
fn test_syntax_error_runs_nothing() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    let result = eng.source(&mut buf, "let g:a = 1\nif 1\n  let g:b = 2\n");
    assert!(matches!(
        script_error(result),
        ScriptErrorKind::MissingEnd { keyword: "endif", .. }
    ));
    assert_eq!(global(&eng, "a"), None);
}

#[test]
fn test_runtime_error_keeps_earlier_statements() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    let result = eng.source(&mut buf, "let g:a = 1\nlet g:b = g:missing\nlet g:c = 3\n");
    let err = result.unwrap_err();
    assert!(err.to_string().starts_with("E121: Undefined variable: g:missing"));
    assert_eq!(global(&eng, "a").as_deref(), Some("1"));
    assert_eq!(global(&eng, "c"), None);
}

#[test]
fn test_echo_variants() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "echo 'a' 'b'").unwrap();
    eng.execute_command_line(&mut buf, "echon 'a' 'b'").unwrap();
    assert_eq!(eng.take_messages(), vec!["a b".to_string(), "ab".to_string()]);

    let result = eng.execute_command_line(&mut buf, "echoerr 'bad thing'");
    assert_eq!(script_error(result), ScriptErrorKind::EchoErr("bad thing".into()));
}

#[test]
fn test_lambda_with_map() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "echo map([1, 2, 3], {k, v -> v * v})")
        .unwrap();
    assert_eq!(eng.take_messages(), vec!["[1, 4, 9]".to_string()]);
}

#[test]
fn test_options_and_registers_as_variables() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    let script = "\
let &shiftwidth = 2
let @a = 'xyz'
echo &sw @a
";
    eng.source(&mut buf, script).unwrap();
    assert_eq!(eng.take_messages(), vec!["2 xyz".to_string()]);
    assert_eq!(eng.shared().lock().options.shiftwidth(), 2);
}

#[test]
fn test_execute_captures_output() {
    let mut buf = MockBuffer::new("");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "let g:out = execute('echo 42')")
        .unwrap();
    assert_eq!(global(&eng, "out").as_deref(), Some("\n42"));
    assert!(eng.take_messages().is_empty());
}

#[test]
fn test_normal_command() {
    let mut buf = MockBuffer::new("one two");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "normal! dw").unwrap();
    assert_eq!(buf.text(), "two");

    eng.execute_command_line(&mut buf, "normal d").unwrap();
    assert_eq!(buf.text(), "two");
    assert_eq!(eng.mode(), Mode::Normal);
    assert_eq!(eng.pending_keys(), "");
}

#[test]
fn test_normal_over_a_range_finishes_insert() {
    let mut buf = MockBuffer::new("a\nb\nc");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "1,2normal A;").unwrap();
    assert_eq!(buf.text(), "a;\nb;\nc");
    assert_eq!(eng.mode(), Mode::Normal);
}

#[test]
fn test_normal_uses_mappings_unless_banged() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "nnoremap x dd").unwrap();
    eng.execute_command_line(&mut buf, "normal! x").unwrap();
    assert_eq!(buf.text(), "bc");
    eng.execute_command_line(&mut buf, "normal x").unwrap();
    assert_eq!(buf.text(), "");
}

#[test]
fn test_feedkeys_runs_after_the_command() {
    let mut buf = MockBuffer::new("a\nb");
    let mut eng = Engine::new();

    eng.execute_command_line(&mut buf, "call feedkeys('dd')").unwrap();
    assert_eq!(buf.text(), "b");
    assert_eq!(eng.pending_keys(), "");
}

#[test]
fn test_feedkeys_execute_flag_runs_immediately() {
    let mut buf = MockBuffer::new("abc");
    let mut eng = Engine::new();

    let script = "\
call feedkeys('x', 'x')
let g:line = getline(1)
";
    eng.source(&mut buf, script).unwrap();
    assert_eq!(global(&eng, "line").as_deref(), Some("bc"));
}

#[test]
fn test_script_globals_are_shared() {
    let mut buf = MockBuffer::new("");
    let mut first = Engine::new();
    let mut second = Engine::builder().shared(first.shared()).build();

    first.execute_command_line(&mut buf, "let g:greeting = 'hi'").unwrap();
    second.execute_command_line(&mut buf, "echo g:greeting").unwrap();
    assert_eq!(second.take_messages(), vec!["hi".to_string()]);
}
