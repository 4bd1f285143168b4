//! Текстовый командный канал RHX (порт 5000).
//!
//! Запросы: `get <param>`, `set <param> <value>`, `execute <action> [arg]`.
//! На `get` контроллер отвечает `Return: <Param> <value>`, на ошибку
//! `Error: <message>`; `set` и `execute` ответа не дают, поэтому после них
//! выдерживается пауза, чтобы контроллер успел применить настройку.
//!
//! Ответ приходит без терминатора и может быть разбит на несколько
//! TCP-сегментов: клиент дочитывает его до полной формы, а затем ждёт
//! [`REPLY_QUIET_PERIOD`], пока не перестанут приходить байты.

use std::{
    io::{self, ErrorKind, Read, Write},
    net::TcpStream,
    thread,
    time::Duration,
};

use log::{debug, info};
use rhx_types::{Band, ChannelOutputConfig};

use crate::{AcquireError, AcquireResult};

/// Размер буфера для одного ответа.
pub const COMMAND_BUFFER_SIZE: usize = 1024;

/// Пауза после `set` / `execute` по умолчанию.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Тишина в канале, после которой ответ считается полученным.
pub const REPLY_QUIET_PERIOD: Duration = Duration::from_millis(20);

const RETURN_PREFIX: &str = "Return:";
const ERROR_PREFIX: &str = "Error:";

/// Запрос командного канала
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { param: String },
    Set { param: String, value: String },
    Execute { action: String, arg: Option<String> },
}

/// Разобранный ответ `Return: <Param> <value>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub param: String,
    pub value: String,
}

/// Режим работы контроллера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Run,
    Stop,
    Record,
    Trigger,
}

/// Командный канал с настраиваемым таймаутом чтения.
pub trait CommandStream: Read + Write {
    /// `None`: блокирующее чтение без ограничения.
    fn set_reply_timeout(
        &mut self,
        timeout: Option<Duration>,
    ) -> io::Result<()>;
}

impl CommandStream for TcpStream {
    fn set_reply_timeout(
        &mut self,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

/// Блокирующий клиент командного канала.
pub struct CommandClient<S: CommandStream> {
    stream: S,
    settle_delay: Duration,
    buf: Vec<u8>,
}

////////////////////////////////////////////////////////////////////////////////
// Command, CommandResponse
////////////////////////////////////////////////////////////////////////////////

impl Command {
    pub fn get(param: &str) -> Self {
        Command::Get {
            param: param.to_string(),
        }
    }

    pub fn set(
        param: &str,
        value: &str,
    ) -> Self {
        Command::Set {
            param: param.to_string(),
            value: value.to_string(),
        }
    }

    pub fn execute(
        action: &str,
        arg: Option<&str>,
    ) -> Self {
        Command::Execute {
            action: action.to_string(),
            arg: arg.map(str::to_string),
        }
    }

    /// `true`, если на команду приходит ответ.
    pub fn expects_response(&self) -> bool {
        matches!(self, Command::Get { .. })
    }
}

impl CommandResponse {
    /// Разбирает ответ контроллера. `Error: ...` превращается в
    /// [`AcquireError::Command`].
    pub fn parse(
        raw: &str,
        command: &Command,
    ) -> AcquireResult<Self> {
        let text = raw.trim();

        if let Some(message) = text.strip_prefix(ERROR_PREFIX) {
            return Err(AcquireError::Command {
                command: command.to_string(),
                message: message.trim().to_string(),
            });
        }

        let unexpected = || AcquireError::UnexpectedResponse {
            command: command.to_string(),
            response: text.to_string(),
        };

        let body = text.strip_prefix(RETURN_PREFIX).ok_or_else(unexpected)?;
        let (param, value) = body.trim().split_once(' ').ok_or_else(unexpected)?;

        if let Command::Get { param: requested } = command {
            if !param.eq_ignore_ascii_case(requested) {
                return Err(unexpected());
            }
        }

        Ok(Self {
            param: param.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl std::fmt::Display for Command {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Command::Get { param } => write!(f, "get {param}"),
            Command::Set { param, value } => write!(f, "set {param} {value}"),
            Command::Execute { action, arg: None } => write!(f, "execute {action}"),
            Command::Execute {
                action,
                arg: Some(arg),
            } => write!(f, "execute {action} {arg}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// RunMode
////////////////////////////////////////////////////////////////////////////////

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Run => "run",
            RunMode::Stop => "stop",
            RunMode::Record => "record",
            RunMode::Trigger => "trigger",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" => Ok(RunMode::Run),
            "stop" => Ok(RunMode::Stop),
            "record" => Ok(RunMode::Record),
            "trigger" => Ok(RunMode::Trigger),
            _ => Err(format!(
                "Unknown run mode: '{s}'. Use: run, stop, record, trigger"
            )),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// CommandClient
////////////////////////////////////////////////////////////////////////////////

impl<S: CommandStream> CommandClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            settle_delay: DEFAULT_SETTLE_DELAY,
            buf: vec![0u8; COMMAND_BUFFER_SIZE],
        }
    }

    pub fn with_settle_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Отправляет команду; для `get` читает и разбирает ответ.
    pub fn send(
        &mut self,
        command: &Command,
    ) -> AcquireResult<Option<CommandResponse>> {
        debug!("-> {command}");

        self.stream.write_all(command.to_string().as_bytes())?;
        self.stream.flush()?;

        if !command.expects_response() {
            if !self.settle_delay.is_zero() {
                thread::sleep(self.settle_delay);
            }
            return Ok(None);
        }

        let raw = self.read_reply(command)?;
        debug!("<- {}", raw.trim());

        CommandResponse::parse(&raw, command).map(Some)
    }

    /// Читает ответ целиком: сначала до полной формы, затем до тишины.
    fn read_reply(
        &mut self,
        command: &Command,
    ) -> AcquireResult<String> {
        let mut reply = Vec::new();

        while !reply_is_complete(&reply) && reply.len() < COMMAND_BUFFER_SIZE {
            let n = self.stream.read(&mut self.buf)?;
            if n == 0 {
                if reply.is_empty() {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("command channel closed while waiting for '{command}'"),
                    )
                    .into());
                }
                break;
            }
            reply.extend_from_slice(&self.buf[..n]);
        }

        // Хвост значения может прийти отдельным сегментом.
        self.stream.set_reply_timeout(Some(REPLY_QUIET_PERIOD))?;
        let tail = self.read_until_quiet(&mut reply);
        self.stream.set_reply_timeout(None)?;
        tail?;

        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    fn read_until_quiet(
        &mut self,
        reply: &mut Vec<u8>,
    ) -> AcquireResult<()> {
        while reply.len() < COMMAND_BUFFER_SIZE {
            match self.stream.read(&mut self.buf) {
                Ok(0) => break,
                Ok(n) => reply.extend_from_slice(&self.buf[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    break
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Значение параметра строкой.
    pub fn get(
        &mut self,
        param: &str,
    ) -> AcquireResult<String> {
        let command = Command::get(param);

        match self.send(&command)? {
            Some(resp) => Ok(resp.value),
            None => Err(AcquireError::UnexpectedResponse {
                command: command.to_string(),
                response: String::new(),
            }),
        }
    }

    /// Значение числового параметра.
    pub fn get_f64(
        &mut self,
        param: &str,
    ) -> AcquireResult<f64> {
        let value = self.get(param)?;

        value
            .parse()
            .map_err(|_| AcquireError::UnexpectedResponse {
                command: Command::get(param).to_string(),
                response: value,
            })
    }

    /// Значение логического параметра (`True` / `False`).
    pub fn get_bool(
        &mut self,
        param: &str,
    ) -> AcquireResult<bool> {
        let value = self.get(param)?;

        match value.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(AcquireError::UnexpectedResponse {
                command: Command::get(param).to_string(),
                response: value,
            }),
        }
    }

    pub fn set(
        &mut self,
        param: &str,
        value: &str,
    ) -> AcquireResult<()> {
        self.send(&Command::set(param, value)).map(|_| ())
    }

    pub fn execute(
        &mut self,
        action: &str,
        arg: Option<&str>,
    ) -> AcquireResult<()> {
        self.send(&Command::execute(action, arg)).map(|_| ())
    }

    /// Частота дискретизации контроллера, Гц.
    pub fn sample_rate_hz(&mut self) -> AcquireResult<f64> {
        self.get_f64("sampleratehertz")
    }

    pub fn run_mode(&mut self) -> AcquireResult<RunMode> {
        let value = self.get("runmode")?;

        value
            .parse()
            .map_err(|_| AcquireError::UnexpectedResponse {
                command: Command::get("runmode").to_string(),
                response: value,
            })
    }

    pub fn set_run_mode(
        &mut self,
        mode: RunMode,
    ) -> AcquireResult<()> {
        self.set("runmode", mode.as_str())
    }

    /// `true`, пока контроллер загружает настройки в железо.
    pub fn upload_in_progress(&mut self) -> AcquireResult<bool> {
        self.get_bool("uploadinprogress")
    }

    /// Тип контроллера (`ControllerRecordUSB3`, `ControllerStimRecordUSB2`, ...).
    pub fn controller_type(&mut self) -> AcquireResult<String> {
        self.get("type")
    }

    /// Выключает TCP вывод на всех каналах.
    pub fn clear_all_data_outputs(&mut self) -> AcquireResult<()> {
        self.execute("clearalldataoutputs", None)
    }

    /// Включает TCP вывод полосы `band` для канала `channel` (`a-010`).
    pub fn enable_band(
        &mut self,
        channel: &str,
        band: Band,
    ) -> AcquireResult<()> {
        self.set(&format!("{channel}.{}", band.output_property()), "true")
    }
}

/// `true`, если в ответе уже есть и параметр, и значение (или текст ошибки).
/// Нераспознаваемый текст считается полным: его отвергнет разбор.
fn reply_is_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_start();

    if let Some(body) = text.strip_prefix(RETURN_PREFIX) {
        return body
            .trim()
            .split_once(' ')
            .is_some_and(|(_, value)| !value.trim().is_empty());
    }
    if let Some(message) = text.strip_prefix(ERROR_PREFIX) {
        return !message.trim().is_empty();
    }

    !(RETURN_PREFIX.starts_with(text) || ERROR_PREFIX.starts_with(text))
}

/// Готовит контроллер к приёму и возвращает частоту дискретизации.
///
/// Последовательность: проверка загрузки, остановка, запрос частоты, сброс
/// всех выводов, включение нужных полос для одного канала. Запуск
/// (`set runmode run`) остаётся за вызывающим.
pub fn prepare_acquisition<S: CommandStream>(
    client: &mut CommandClient<S>,
    channel: &str,
    outputs: &ChannelOutputConfig,
) -> AcquireResult<f64> {
    if client.upload_in_progress()? {
        return Err(AcquireError::ControllerBusy(
            "upload in progress, try again once it completes".to_string(),
        ));
    }

    if client.run_mode()? != RunMode::Stop {
        info!("Controller is running, stopping it first");
        client.set_run_mode(RunMode::Stop)?;
    }

    let sample_rate_hz = client.sample_rate_hz()?;
    if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return Err(AcquireError::UnexpectedResponse {
            command: Command::get("sampleratehertz").to_string(),
            response: sample_rate_hz.to_string(),
        });
    }

    client.clear_all_data_outputs()?;

    for band in outputs.field_order() {
        client.enable_band(channel, band)?;
    }

    info!("Controller ready: {channel} [{outputs}] @ {sample_rate_hz} Hz");

    Ok(sample_rate_hz)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
