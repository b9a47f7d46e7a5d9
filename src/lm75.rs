use core::fmt;
use embedded_hal_async::i2c::I2c;
use fixed::types::I8F8;

use crate::sensor::SensorError;

/// LM75 I2C default address (A2..A0 tied low)
pub const LM75_DEFAULT_ADDR: u8 = 0x48;

/// LM75 register pointers
mod reg {
    pub const TEMP: u8 = 0x00;
    pub const CONFIG: u8 = 0x01;
    pub const THYST: u8 = 0x02;
    pub const TOS: u8 = 0x03;
}

/// Only the upper nine bits of a temperature word are significant.
const NINE_BIT_MASK: i16 = !0x007F;

bitflags::bitflags! {
    /// Configuration register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Config: u8 {
        const SHUTDOWN     = 0b0000_0001;
        /// OS output in interrupt mode instead of comparator mode
        const INTERRUPT    = 0b0000_0010;
        /// OS output active high
        const OS_POLARITY  = 0b0000_0100;
        const FAULT_QUEUE0 = 0b0000_1000;
        const FAULT_QUEUE1 = 0b0001_0000;
    }
}

/// LM75 driver error
#[derive(Debug)]
pub enum Error<I2cE> {
    I2c(I2cE),
}

impl<I2cE: fmt::Debug> fmt::Display for Error<I2cE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
        }
    }
}

impl<I2cE> From<Error<I2cE>> for SensorError {
    fn from(_: Error<I2cE>) -> Self {
        SensorError::Bus
    }
}

/// LM75 driver
pub struct Lm75<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C, E> Lm75<I2C>
where
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, LM75_DEFAULT_ADDR)
    }

    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Read the temperature register in °C (0.5 °C resolution).
    pub async fn read_celsius(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_word(reg::TEMP).await?;
        Ok(Self::decode(raw))
    }

    /// Overtemperature shutdown threshold (Tos) in °C.
    pub async fn read_tos(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_word(reg::TOS).await?;
        Ok(Self::decode(raw))
    }

    /// Hysteresis threshold (Thyst) in °C.
    pub async fn read_thyst(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_word(reg::THYST).await?;
        Ok(Self::decode(raw))
    }

    pub async fn set_tos(&mut self, celsius: f32) -> Result<(), Error<E>> {
        self.write_word(reg::TOS, Self::encode(celsius)).await
    }

    pub async fn set_thyst(&mut self, celsius: f32) -> Result<(), Error<E>> {
        self.write_word(reg::THYST, Self::encode(celsius)).await
    }

    pub async fn read_config(&mut self) -> Result<Config, Error<E>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.addr, &[reg::CONFIG], &mut buf)
            .await
            .map_err(Error::I2c)?;
        Ok(Config::from_bits_truncate(buf[0]))
    }

    pub async fn write_config(&mut self, config: Config) -> Result<(), Error<E>> {
        self.i2c
            .write(self.addr, &[reg::CONFIG, config.bits()])
            .await
            .map_err(Error::I2c)
    }

    /// Enter or leave low-power shutdown, keeping the other config bits.
    pub async fn set_shutdown(&mut self, shutdown: bool) -> Result<(), Error<E>> {
        let mut config = self.read_config().await?;
        config.set(Config::SHUTDOWN, shutdown);
        self.write_config(config).await
    }

    async fn read_word(&mut self, reg: u8) -> Result<i16, Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .await
            .map_err(Error::I2c)?;
        Ok(i16::from_be_bytes(buf))
    }

    async fn write_word(&mut self, reg: u8, raw: i16) -> Result<(), Error<E>> {
        let [msb, lsb] = raw.to_be_bytes();
        self.i2c
            .write(self.addr, &[reg, msb, lsb])
            .await
            .map_err(Error::I2c)
    }

    /// Big-endian word with the 9-bit two's-complement value left aligned.
    fn decode(raw: i16) -> f32 {
        I8F8::from_bits(raw & NINE_BIT_MASK).to_num::<f32>()
    }

    fn encode(celsius: f32) -> i16 {
        I8F8::saturating_from_num(celsius).to_bits() & NINE_BIT_MASK
    }
}
