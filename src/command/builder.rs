use std::fmt;

pub const PROGRAM: &str = "ffmpeg";

/// An ffmpeg invocation as an ordered token list.
///
/// Input and output file names are kept apart from the option tokens so the
/// same options can be rendered for display (quoted names) or handed to the
/// engine with its own staging names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    program: String,
    input: String,
    options: Vec<String>,
    output: String,
}

impl FfmpegCommand {
    /// Create a new command reading `input`
    pub fn new<S: Into<String>>(input: S) -> Self {
        Self {
            program: PROGRAM.to_string(),
            input: input.into(),
            options: Vec::new(),
            output: String::new(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.options.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Set output file
    pub fn output<S: Into<String>>(mut self, name: S) -> Self {
        self.output = name.into();
        self
    }

    /// Seek to position in the input
    pub fn seek<S: Into<String>>(self, position: S) -> Self {
        self.arg("-ss").arg(position)
    }

    /// Limit output duration
    pub fn duration<S: Into<String>>(self, length: S) -> Self {
        self.arg("-t").arg(length)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    pub fn video_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:v").arg(bitrate)
    }

    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    pub fn preset<S: Into<String>>(self, preset: S) -> Self {
        self.arg("-preset").arg(preset)
    }

    pub fn profile<S: Into<String>>(self, profile: S) -> Self {
        self.arg("-profile:v").arg(profile)
    }

    pub fn level<S: Into<String>>(self, level: S) -> Self {
        self.arg("-level").arg(level)
    }

    pub fn frame_rate<S: Into<String>>(self, fps: S) -> Self {
        self.arg("-r").arg(fps)
    }

    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// Set audio channels
    pub fn audio_channels<S: Into<String>>(self, channels: S) -> Self {
        self.arg("-ac").arg(channels)
    }

    /// Set audio sample rate
    pub fn audio_sample_rate<S: Into<String>>(self, rate: S) -> Self {
        self.arg("-ar").arg(rate)
    }

    /// Option tokens between the input and the output file
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Full token list, unquoted: program, `-i`, input, options, output
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(self.options.len() + 4);
        tokens.push(self.program.clone());
        tokens.push("-i".to_string());
        tokens.push(self.input.clone());
        tokens.extend(self.options.iter().cloned());
        tokens.push(self.output.clone());
        tokens
    }
}

impl fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -i \"{}\"", self.program, self.input)?;
        for option in &self.options {
            write!(f, " {}", option)?;
        }
        write!(f, " \"{}\"", self.output)
    }
}
